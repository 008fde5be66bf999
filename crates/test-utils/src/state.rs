use settle_primitives::{
    buf::Buf20,
    constants::EXCHANGE_MULTIPLIER,
    params::{RollupParams, VerifierParams},
};
use settle_state::{
    bucket::{Bucket, MAX_CEIL_USD},
    rollup_state::{GenesisStateConfig, RollupState},
};

pub const TEST_CHAIN_ID: u16 = 1337;
pub const TEST_ROLLUP_ADDRESS: Buf20 = Buf20([0x12; 20]);
pub const TEST_GOVERNANCE: Buf20 = Buf20([0x60; 20]);
pub const TEST_FEE_TOKEN: Buf20 = Buf20([0x08; 20]);

/// Listing fee charged at genesis.
pub const TEST_FEE_ADD_TOKEN: u128 = 1_000;

/// Blocks a run of L2 batches may last before an L1 batch is forced.
pub const TEST_L1L2_TIMEOUT: u64 = 10;

/// Live L1 queue slots allowed at once.
pub const TEST_MAX_PENDING_L1_QUEUES: u64 = 16;

/// Ether valued at 2000 USD.
pub const TEST_ETHER_RATE: u64 = 2000 * EXCHANGE_MULTIPLIER;

pub fn test_params() -> RollupParams {
    RollupParams {
        chain_id: TEST_CHAIN_ID,
        rollup_address: TEST_ROLLUP_ADDRESS,
        governance: TEST_GOVERNANCE,
        fee_token: TEST_FEE_TOKEN,
        verifiers: vec![
            VerifierParams {
                max_tx: 344,
                n_levels: 32,
            },
            VerifierParams {
                max_tx: 1912,
                n_levels: 32,
            },
        ],
    }
}

/// Two capped buckets, up to 1000 USD and up to 100k USD, with nothing
/// allowed above that.
pub fn test_buckets() -> Vec<Bucket> {
    vec![
        Bucket {
            ceil_usd: 1_000,
            block_stamp: 0,
            withdrawals: 4,
            rate_blocks: 10,
            rate_withdrawals: 1,
            max_withdrawals: 4,
        },
        Bucket {
            ceil_usd: 100_000,
            block_stamp: 0,
            withdrawals: 1,
            rate_blocks: 100,
            rate_withdrawals: 1,
            max_withdrawals: 1,
        },
        Bucket {
            ceil_usd: MAX_CEIL_USD,
            block_stamp: 0,
            withdrawals: 0,
            rate_blocks: 1,
            rate_withdrawals: 0,
            max_withdrawals: 0,
        },
    ]
}

pub fn genesis_config() -> GenesisStateConfig {
    GenesisStateConfig {
        genesis_block: 0,
        forge_l1l2_batch_timeout: TEST_L1L2_TIMEOUT,
        max_pending_l1_queues: TEST_MAX_PENDING_L1_QUEUES,
        buckets: test_buckets(),
        tokens: Vec::new(),
        exchange_rates: vec![(Buf20::zero(), TEST_ETHER_RATE)],
        fee_add_token: TEST_FEE_ADD_TOKEN,
    }
}

/// Fresh state at block 0 with only ether registered.
pub fn genesis_state() -> RollupState {
    RollupState::from_genesis(genesis_config()).expect("test genesis is valid")
}
