use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use alloy_primitives::U256;
use settle_primitives::{
    buf::{Buf20, Buf32},
    hash::compute_borsh_hash,
    l1tx::L1Tx,
};

use crate::{
    account_idx::AccountIndexAllocator,
    batch::{BatchChain, BatchRecord},
    bucket::{Bucket, BucketSet},
    errors::StateError,
    l1_queue::{L1TxQueue, QueuePosition},
    nullifier::{ExitAccumulator, ExitNullifiers},
    tokens::{TokenEntry, TokenTable},
};

/// Everything the settlement core keeps between calls.
///
/// Entry points run every check against a shared borrow first and only then
/// write through the mutators below, so a call that fails leaves the state
/// as it was.  Each mutator is atomic on its own.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct RollupState {
    pub(crate) l1_queue: L1TxQueue,
    pub(crate) accounts: AccountIndexAllocator,
    pub(crate) batches: BatchChain,
    pub(crate) buckets: BucketSet,
    pub(crate) tokens: TokenTable,
    pub(crate) exit_nullifiers: ExitNullifiers,
    pub(crate) exit_accumulator: ExitAccumulator,

    /// Fee charged for listing a token.
    pub(crate) fee_add_token: u128,

    /// Max blocks between L1 batches.
    pub(crate) forge_l1l2_batch_timeout: u64,

    /// Block of the last L1 batch, or genesis.
    pub(crate) last_l1l2_batch: u64,
}

/// Hashed rollup state, what [`RollupState::compute_commitment`] commits to.
#[derive(BorshSerialize)]
struct HashedRollupState {
    l1_queue_hash: Buf32,
    last_idx: u64,
    tip_batch_hash: Buf32,
    last_batch_num: u64,
    buckets_hash: Buf32,
    tokens_hash: Buf32,
    exit_nullifiers_hash: Buf32,
    exit_accumulator_hash: Buf32,
    fee_add_token: u128,
    forge_l1l2_batch_timeout: u64,
    last_l1l2_batch: u64,
}

/// Starting configuration for a fresh deployment.
#[derive(Clone, Debug)]
pub struct GenesisStateConfig {
    pub genesis_block: u64,
    pub forge_l1l2_batch_timeout: u64,
    pub max_pending_l1_queues: u64,
    pub buckets: Vec<Bucket>,
    pub tokens: Vec<TokenEntry>,
    pub exchange_rates: Vec<(Buf20, u64)>,
    pub fee_add_token: u128,
}

impl RollupState {
    /// Builds the genesis state, the native asset always being token 0.
    pub fn from_genesis(config: GenesisStateConfig) -> Result<Self, StateError> {
        let mut tokens = TokenTable::default();
        for entry in config.tokens {
            tokens.register(entry)?;
        }
        for (addr, rate) in config.exchange_rates {
            tokens.set_exchange_rate(addr, rate);
        }

        let buckets = BucketSet::try_new(config.buckets, config.genesis_block)?;

        Ok(Self {
            l1_queue: L1TxQueue::new(config.max_pending_l1_queues),
            accounts: AccountIndexAllocator::default(),
            batches: BatchChain::default(),
            buckets,
            tokens,
            exit_nullifiers: ExitNullifiers::default(),
            exit_accumulator: ExitAccumulator::default(),
            fee_add_token: config.fee_add_token,
            forge_l1l2_batch_timeout: config.forge_l1l2_batch_timeout,
            last_l1l2_batch: config.genesis_block,
        })
    }

    pub fn l1_queue(&self) -> &L1TxQueue {
        &self.l1_queue
    }

    pub fn accounts(&self) -> &AccountIndexAllocator {
        &self.accounts
    }

    pub fn last_idx(&self) -> u64 {
        self.accounts.last_idx()
    }

    pub fn batches(&self) -> &BatchChain {
        &self.batches
    }

    pub fn last_batch(&self) -> &BatchRecord {
        self.batches.tip()
    }

    pub fn buckets(&self) -> &BucketSet {
        &self.buckets
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    pub fn exit_nullifiers(&self) -> &ExitNullifiers {
        &self.exit_nullifiers
    }

    pub fn exit_accumulator(&self) -> &ExitAccumulator {
        &self.exit_accumulator
    }

    pub fn fee_add_token(&self) -> u128 {
        self.fee_add_token
    }

    pub fn forge_l1l2_batch_timeout(&self) -> u64 {
        self.forge_l1l2_batch_timeout
    }

    pub fn last_l1l2_batch(&self) -> u64 {
        self.last_l1l2_batch
    }

    /// Computes a commitment to the whole state.  Expensive, it hashes
    /// every pending queue slot.
    pub fn compute_commitment(&self) -> Buf32 {
        let hashed = HashedRollupState {
            l1_queue_hash: compute_borsh_hash(&self.l1_queue),
            last_idx: self.accounts.last_idx(),
            tip_batch_hash: compute_borsh_hash(self.batches.tip()),
            last_batch_num: self.batches.last_batch_num(),
            buckets_hash: compute_borsh_hash(&self.buckets),
            tokens_hash: compute_borsh_hash(&self.tokens),
            exit_nullifiers_hash: compute_borsh_hash(&self.exit_nullifiers),
            exit_accumulator_hash: compute_borsh_hash(&self.exit_accumulator),
            fee_add_token: self.fee_add_token,
            forge_l1l2_batch_timeout: self.forge_l1l2_batch_timeout,
            last_l1l2_batch: self.last_l1l2_batch,
        };
        compute_borsh_hash(&hashed)
    }

    pub fn enqueue_l1_tx(&mut self, tx: &L1Tx) -> Result<QueuePosition, StateError> {
        Ok(self.l1_queue.enqueue(tx)?)
    }

    /// Consumes the to-forge slot, returning its raw bytes.
    pub fn rotate_l1_queue(&mut self) -> Vec<u8> {
        self.l1_queue.rotate()
    }

    pub fn advance_last_idx(&mut self, idx: u64) -> Result<(), StateError> {
        self.accounts.advance_to(idx)
    }

    pub fn append_batch(&mut self, rec: BatchRecord) -> Result<(), StateError> {
        self.batches.append(rec)
    }

    pub fn set_last_l1l2_batch(&mut self, block: u64) {
        self.last_l1l2_batch = block;
    }

    /// Overwrites a single bucket after a refill and consume.
    pub fn put_bucket(&mut self, idx: usize, bucket: Bucket) -> Result<(), StateError> {
        let slot = self
            .buckets
            .get_mut(idx)
            .ok_or(StateError::UnknownBucket(idx))?;
        *slot = bucket;
        Ok(())
    }

    pub fn set_buckets(&mut self, set: BucketSet) {
        self.buckets = set;
    }

    pub fn set_exchange_rate(&mut self, addr: Buf20, rate: u64) {
        self.tokens.set_exchange_rate(addr, rate);
    }

    pub fn register_token(&mut self, entry: TokenEntry) -> Result<u32, StateError> {
        self.tokens.register(entry)
    }

    /// Marks an exit leaf as withdrawn.
    pub fn claim_exit(&mut self, batch_num: u64, idx: u64) -> Result<(), StateError> {
        self.exit_nullifiers.claim(batch_num, idx)
    }

    /// Adds to what was withdrawn from `idx`'s cumulative exit of `total`.
    pub fn accumulate_exit(&mut self, idx: u64, amount: U256, total: U256) -> Result<(), StateError> {
        self.exit_accumulator.add(idx, amount, total)
    }

    pub fn set_forge_l1l2_batch_timeout(&mut self, timeout: u64) {
        self.forge_l1l2_batch_timeout = timeout;
    }

    pub fn set_fee_add_token(&mut self, fee: u128) {
        self.fee_add_token = fee;
    }
}
