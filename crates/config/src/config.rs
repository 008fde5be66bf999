use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};
use settle_primitives::{
    buf::Buf20,
    constants::ABSOLUTE_MAX_L1L2BATCHTIMEOUT,
    params::{RollupParams, VerifierParams, MIN_PENDING_L1_QUEUES},
};
use settle_state::{
    bucket::{Bucket, MAX_CEIL_USD},
    errors::StateError,
    rollup_state::{GenesisStateConfig, RollupState},
    tokens::TokenEntry,
};
use thiserror::Error;

/// Default value for `chain_id` in [`RollupConfig`].
const DEFAULT_CHAIN_ID: u16 = 0;

/// Default value for `max_pending_l1_queues` in [`RollupConfig`].
const DEFAULT_MAX_PENDING_L1_QUEUES: u64 = 16;

/// Default value for `forge_l1l2_batch_timeout` in [`GenesisConfig`].
const DEFAULT_FORGE_L1L2_BATCH_TIMEOUT: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("forge L1/L2 batch timeout {0} exceeds the maximum")]
    TimeoutTooLarge(u64),

    #[error("max_pending_l1_queues must be at least {MIN_PENDING_L1_QUEUES}, got {0}")]
    TooFewQueues(u64),

    #[error("no verifier configured")]
    NoVerifiers,

    #[error("genesis: {0}")]
    Genesis(#[from] StateError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollupConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u16,

    /// Address coordinator authorizations are bound to.
    pub rollup_address: Buf20,

    pub governance: Buf20,

    /// Token listing fees are paid in.
    pub fee_token: Buf20,

    /// Bound on the live L1 queue slots.
    #[serde(default = "default_max_pending_l1_queues")]
    pub max_pending_l1_queues: u64,

    /// Circuit shapes, in verifier slot order.
    pub verifiers: Vec<VerifierParams>,
}

/// One instant withdrawal bucket.  A missing ceiling makes it a catch-all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketConfig {
    pub ceil_usd: Option<u64>,
    #[serde(default)]
    pub withdrawals: u32,
    pub rate_blocks: u32,
    pub rate_withdrawals: u32,
    pub max_withdrawals: u32,
}

impl From<&BucketConfig> for Bucket {
    fn from(value: &BucketConfig) -> Self {
        Bucket {
            ceil_usd: value.ceil_usd.map_or(MAX_CEIL_USD, u128::from),
            block_stamp: 0,
            withdrawals: value.withdrawals,
            rate_blocks: value.rate_blocks,
            rate_withdrawals: value.rate_withdrawals,
            max_withdrawals: value.max_withdrawals,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateConfig {
    pub address: Buf20,
    /// USD per whole token, 10 decimal fixed point.
    pub rate: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    #[serde(default)]
    pub genesis_block: u64,

    #[serde(default = "default_forge_l1l2_batch_timeout")]
    pub forge_l1l2_batch_timeout: u64,

    /// Instant withdrawals stay disabled until governance sets buckets if
    /// this is empty.
    #[serde(default)]
    pub buckets: Vec<BucketConfig>,

    /// Tokens registered after ether.
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,

    #[serde(default)]
    pub exchange_rates: Vec<ExchangeRateConfig>,

    /// Fee for listing a token, in fee token units.
    #[serde(default)]
    pub fee_add_token: u64,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            genesis_block: 0,
            forge_l1l2_batch_timeout: DEFAULT_FORGE_L1L2_BATCH_TIMEOUT,
            buckets: Vec::new(),
            tokens: Vec::new(),
            exchange_rates: Vec::new(),
            fee_add_token: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rollup: RollupConfig,
    #[serde(default)]
    pub genesis: GenesisConfig,
}

fn default_chain_id() -> u16 {
    DEFAULT_CHAIN_ID
}

fn default_max_pending_l1_queues() -> u64 {
    DEFAULT_MAX_PENDING_L1_QUEUES
}

fn default_forge_l1l2_batch_timeout() -> u64 {
    DEFAULT_FORGE_L1L2_BATCH_TIMEOUT
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.genesis.forge_l1l2_batch_timeout > ABSOLUTE_MAX_L1L2BATCHTIMEOUT {
            return Err(ConfigError::TimeoutTooLarge(
                self.genesis.forge_l1l2_batch_timeout,
            ));
        }
        if self.rollup.max_pending_l1_queues < MIN_PENDING_L1_QUEUES {
            return Err(ConfigError::TooFewQueues(self.rollup.max_pending_l1_queues));
        }
        if self.rollup.verifiers.is_empty() {
            return Err(ConfigError::NoVerifiers);
        }
        Ok(())
    }

    pub fn rollup_params(&self) -> RollupParams {
        RollupParams {
            chain_id: self.rollup.chain_id,
            rollup_address: self.rollup.rollup_address,
            governance: self.rollup.governance,
            fee_token: self.rollup.fee_token,
            verifiers: self.rollup.verifiers.clone(),
        }
    }

    pub fn genesis_state_config(&self) -> GenesisStateConfig {
        let buckets = if self.genesis.buckets.is_empty() {
            vec![Bucket::safe_mode()]
        } else {
            self.genesis.buckets.iter().map(Bucket::from).collect()
        };

        GenesisStateConfig {
            genesis_block: self.genesis.genesis_block,
            forge_l1l2_batch_timeout: self.genesis.forge_l1l2_batch_timeout,
            max_pending_l1_queues: self.rollup.max_pending_l1_queues,
            buckets,
            tokens: self.genesis.tokens.clone(),
            exchange_rates: self
                .genesis
                .exchange_rates
                .iter()
                .map(|r| (r.address, r.rate))
                .collect(),
            fee_add_token: u128::from(self.genesis.fee_add_token),
        }
    }

    pub fn genesis_state(&self) -> Result<RollupState, ConfigError> {
        Ok(RollupState::from_genesis(self.genesis_state_config())?)
    }
}
