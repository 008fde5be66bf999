//! Constants for magic numbers and protocol limits.

use alloy_primitives::U256;

/// Size (in bytes) of an encoded L1 user transaction.
///
/// `20 ethAddr + 32 bjj + 6 fromIdx + 2 loadAmountF + 2 amountF + 4 tokenID + 6 toIdx`.
pub const L1_USER_TOTALBYTES: usize = 72;

/// Size (in bytes) of a coordinator L1 transaction as submitted to forge.
///
/// `1 v + 32 r + 32 s + 32 bjj + 4 tokenID`.
pub const L1_COORDINATOR_TOTALBYTES: usize = 101;

/// Maximum L1 transactions (user and coordinator) in a single batch.
pub const MAX_L1_TX: usize = 256;

/// Maximum L1 user transactions held by a single queue slot.
pub const MAX_L1_USER_TX: usize = 128;

/// Account indices up to and including this one are reserved.
pub const RESERVED_IDX: u64 = 255;

/// Destination index used by exit transactions.
pub const EXIT_IDX: u64 = 1;

/// Largest account index representable in the 48-bit index fields.
pub const MAX_ACCOUNT_IDX: u64 = (1 << 48) - 1;

/// Number of fee-receiving accounts the coordinator can designate per batch.
pub const MAX_FEE_IDX_COORDINATOR: usize = 64;

/// Upper bound for the L1/L2 batch timeout that governance may configure.
pub const ABSOLUTE_MAX_L1L2BATCHTIMEOUT: u64 = 240;

/// Maximum number of instant withdrawal buckets.
pub const MAX_BUCKETS: usize = 5;

/// Maximum withdrawal delay governance may forward to the escrow, in seconds.
pub const MAX_WITHDRAWAL_DELAY: u64 = 2 * 7 * 24 * 60 * 60;

/// Maximum exit leaves a single multi token withdrawal may cover.
pub const MAX_TOKEN_WITHDRAW: usize = 4;

/// Fixed point multiplier of token exchange rates (10 decimals).
pub const EXCHANGE_MULTIPLIER: u64 = 10_000_000_000;

/// Decimals assumed for the native asset (token id 0).
pub const ETHER_DECIMALS: u8 = 18;

/// Exclusive upper bound of a deposited load amount (`2^128`).
pub const LIMIT_LOAD_AMOUNT: U256 = U256::from_limbs([0, 0, 1, 0]);

/// Exclusive upper bound of an L1 transfer amount (`2^192`).
pub const LIMIT_L2TRANSFER_AMOUNT: U256 = U256::from_limbs([0, 0, 0, 1]);

/// Scalar field modulus of BN254; the public input must be a field element.
pub const RFIELD: U256 = U256::from_limbs([
    0x43e1f593f0000001,
    0x2833e84879b97091,
    0xb85045b68181585d,
    0x30644e72e131a029,
]);
