//! Errors raised while mutating the rollup state.

use settle_primitives::errors::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// No more live slots can be opened until a forge consumes one.
    #[error("L1 queue full ({0} live slots)")]
    QueueFull(u64),

    #[error("encode: {0}")]
    Encode(#[from] ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BucketError {
    #[error("at most {max} buckets allowed, got {got}")]
    TooManyBuckets { max: usize, got: usize },

    #[error("bucket {0} starts with more withdrawals than its maximum")]
    WithdrawalsExceedMax(usize),

    #[error("bucket {0} has a zero refill period")]
    ZeroRateBlocks(usize),

    #[error("unpack: {0}")]
    Unpack(#[from] ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("queue: {0}")]
    Queue(#[from] QueueError),

    #[error("bucket: {0}")]
    Bucket(#[from] BucketError),

    #[error("last account index must not go backwards (cur {cur}, new {new})")]
    NonMonotonicIdx { cur: u64, new: u64 },

    #[error("account index {0} out of range")]
    IdxOutOfRange(u64),

    #[error("batch {got} appended out of order (expected {expected})")]
    BatchOutOfOrder { expected: u64, got: u64 },

    #[error("token {0} already registered")]
    TokenAlreadyRegistered(settle_primitives::buf::Buf20),

    #[error("token registry full")]
    TooManyTokens,

    #[error("exit of idx {idx} at batch {batch_num} already claimed")]
    ExitAlreadyClaimed { batch_num: u64, idx: u64 },

    #[error("exit of idx {idx} overdrawn ({withdrawn} withdrawn, {amount} more, {total} total)")]
    ExitOverdrawn {
        idx: u64,
        withdrawn: alloy_primitives::U256,
        amount: alloy_primitives::U256,
        total: alloy_primitives::U256,
    },

    #[error("no bucket at index {0}")]
    UnknownBucket(usize),
}
