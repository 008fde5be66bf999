use alloy_primitives::U256;
use settle_crypto::bjj_auth::AuthError;
use settle_primitives::{buf::Buf20, errors::ParseError};
use settle_state::errors::{BucketError, StateError};
use thiserror::Error;

/// Errors from the external collaborators moving funds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors submitting an L1 user transaction.
#[derive(Debug, Error)]
pub enum L1TxError {
    #[error("token {0} not registered")]
    UnknownToken(u32),

    #[error("load amount {0} does not fit 128 bits")]
    LoadAmountOverflow(U256),

    #[error("amount {0} does not fit 192 bits")]
    AmountOverflow(U256),

    #[error("account creation must not carry a transfer amount")]
    AmountMustBeZero,

    #[error("exit must not carry a load amount")]
    LoadAmountMustBeZero,

    #[error("destination idx {0} does not exist")]
    InvalidToIdx(u64),

    #[error("source idx {0} does not exist")]
    InvalidFromIdx(u64),

    #[error("account creation needs a babyjubjub key")]
    BjjRequired,

    #[error("existing account tx must not carry a babyjubjub key")]
    BjjMustBeZero,

    #[error("encode: {0}")]
    Encode(#[from] ParseError),

    #[error("state: {0}")]
    State(#[from] StateError),

    #[error("deposit: {0}")]
    Vault(#[from] ProviderError),
}

/// Errors forging a batch.  None of these leave any change behind.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("{0} is not allowed to forge at this block")]
    AuctionDenied(Buf20),

    #[error("L1 batch required (block {block}, deadline {deadline})")]
    L1BatchRequired { block: u64, deadline: u64 },

    #[error("{0} L1 txs exceed the batch limit")]
    L1TxOverflow(usize),

    #[error("L1/L2 data of {len} bytes exceeds {max}")]
    L2TxOverflow { len: usize, max: usize },

    #[error("fee idx data of {len} bytes exceeds {max}")]
    InvalidFeeIdxCoordinatorLength { len: usize, max: usize },

    #[error("no verifier in slot {0}")]
    InvalidVerifierIdx(usize),

    #[error("proof rejected")]
    InvalidProof,

    #[error("malformed coordinator txs: {0}")]
    InvalidCoordinatorData(#[from] ParseError),

    #[error("coordinator tx {idx} signature: {source}")]
    InvalidCoordinatorSignature { idx: usize, source: AuthError },

    #[error("state: {0}")]
    State(#[from] StateError),
}

/// Errors from the instant withdrawal limiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WithdrawalLimitError {
    #[error("token {0} not registered")]
    UnknownToken(u32),

    #[error("token {0} declares too many decimals")]
    InvalidDecimals(u32),

    #[error("no bucket covers {0} USD")]
    AmountExceedsMaxBucket(U256),

    #[error("bucket {0} has no withdrawals left")]
    InstantWithdrawalExhausted(usize),
}

/// Errors withdrawing an exited balance.
#[derive(Debug, Error)]
pub enum WithdrawError {
    #[error("token {0} not registered")]
    UnknownToken(u32),

    #[error("amount {0} does not fit 192 bits")]
    AmountOverflow(U256),

    #[error("no exit root for batch {0}")]
    UnknownExitRoot(u64),

    #[error("exit of idx {idx} at batch {batch_num} already withdrawn")]
    WithdrawAlreadyDone { batch_num: u64, idx: u64 },

    #[error("exit tree proof does not match the root")]
    SmtProofInvalid,

    #[error("withdrawal proof rejected")]
    InvalidWithdrawProof,

    #[error("a withdrawal must cover 1 to {max} leaves, got {got}")]
    InvalidLeafCount { got: usize, max: usize },

    #[error("no withdrawal verifier for {0} leaves")]
    NoWithdrawVerifier(usize),

    #[error("instant withdrawal: {0}")]
    Limit(#[from] WithdrawalLimitError),

    #[error("payout: {0}")]
    Payout(#[from] ProviderError),

    /// The first `paid` leaves were paid out and recorded before the payout
    /// of the next one failed.
    #[error("payout failed after {paid} leaves: {source}")]
    PartialPayout { paid: usize, source: ProviderError },

    #[error("state: {0}")]
    State(#[from] StateError),
}

/// Errors listing a token.
#[derive(Debug, Error)]
pub enum TokenListingError {
    #[error("the native asset is always token 0")]
    NativeAddress,

    #[error("listing fee: {0}")]
    Fee(#[from] ProviderError),

    #[error("state: {0}")]
    State(#[from] StateError),
}

/// Errors from governance operations.
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("{0} is not the governance address")]
    OnlyGovernance(Buf20),

    #[error("timeout {0} exceeds the maximum")]
    TimeoutTooLarge(u64),

    #[error("withdrawal delay {0} exceeds the maximum")]
    DelayTooLarge(u64),

    #[error("{addresses} token addresses for {rates} rates")]
    LengthMismatch { addresses: usize, rates: usize },

    #[error("buckets: {0}")]
    Bucket(#[from] BucketError),

    #[error("escrow: {0}")]
    Escrow(#[from] ProviderError),
}
