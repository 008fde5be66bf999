//! Instant withdrawal buckets.
//!
//! Each bucket covers withdrawals up to a USD ceiling and holds a number of
//! withdrawal credits that refill over time, up to a cap.

use alloy_primitives::U256;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use settle_primitives::{constants::MAX_BUCKETS, errors::ParseError};

use crate::errors::BucketError;

/// Largest USD ceiling, accepts any amount.
pub const MAX_CEIL_USD: u128 = (1 << 96) - 1;

const CEIL_BITS: usize = 96;
const WORD_BITS: usize = 32;

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Bucket {
    pub ceil_usd: u128,
    pub block_stamp: u64,
    pub withdrawals: u32,
    pub rate_blocks: u32,
    pub rate_withdrawals: u32,
    pub max_withdrawals: u32,
}

impl Bucket {
    /// Catch-all bucket that never grants a withdrawal.
    pub fn safe_mode() -> Self {
        Self {
            ceil_usd: MAX_CEIL_USD,
            block_stamp: 0,
            withdrawals: 0,
            rate_blocks: 1,
            rate_withdrawals: 0,
            max_withdrawals: 0,
        }
    }

    pub fn accepts(&self, usd: U256) -> bool {
        self.ceil_usd == MAX_CEIL_USD || usd <= U256::from(self.ceil_usd)
    }

    /// Credits whole refill periods elapsed since the stamp.
    ///
    /// A partially elapsed period is kept by only moving the stamp forward by
    /// the periods credited.  Hitting the cap resets the stamp to `block`.
    pub fn refill(&mut self, block: u64) {
        if self.rate_blocks == 0 || block <= self.block_stamp {
            return;
        }

        let periods = (block - self.block_stamp) / u64::from(self.rate_blocks);
        let credits =
            u128::from(self.withdrawals) + u128::from(periods) * u128::from(self.rate_withdrawals);

        if credits >= u128::from(self.max_withdrawals) {
            self.withdrawals = self.max_withdrawals;
            self.block_stamp = block;
        } else {
            // below the u32 cap so this fits
            self.withdrawals = credits as u32;
            self.block_stamp += periods * u64::from(self.rate_blocks);
        }
    }

    /// Packs into the governance word.
    ///
    /// `ceilUSD:96 | blockStamp:32 | withdrawals:32 | rateBlocks:32 |
    /// rateWithdrawals:32 | maxWithdrawals:32`, least significant bits first.
    pub fn pack(&self) -> Result<U256, ParseError> {
        if self.ceil_usd > MAX_CEIL_USD {
            return Err(ParseError::BucketFieldOverflow("ceil_usd"));
        }
        let stamp = u32::try_from(self.block_stamp)
            .map_err(|_| ParseError::BucketFieldOverflow("block_stamp"))?;

        let words = [
            stamp,
            self.withdrawals,
            self.rate_blocks,
            self.rate_withdrawals,
            self.max_withdrawals,
        ];
        let mut out = U256::from(self.ceil_usd);
        for (i, w) in words.into_iter().enumerate() {
            out |= U256::from(w) << (CEIL_BITS + i * WORD_BITS);
        }
        Ok(out)
    }

    pub fn unpack(word: U256) -> Self {
        let mask32 = U256::from(u32::MAX);
        let field = |i: usize| -> u32 { ((word >> (CEIL_BITS + i * WORD_BITS)) & mask32).to::<u32>() };
        let ceil = word & U256::from(MAX_CEIL_USD);
        Self {
            ceil_usd: ceil.to::<u128>(),
            block_stamp: u64::from(field(0)),
            withdrawals: field(1),
            rate_blocks: field(2),
            rate_withdrawals: field(3),
            max_withdrawals: field(4),
        }
    }
}

/// The ordered tiers, lowest ceiling first.
#[derive(
    Clone, Debug, Default, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct BucketSet {
    buckets: Vec<Bucket>,
}

impl BucketSet {
    /// Validates a governance bucket update, stamping every bucket at `block`.
    pub fn try_new(mut buckets: Vec<Bucket>, block: u64) -> Result<Self, BucketError> {
        if buckets.len() > MAX_BUCKETS {
            return Err(BucketError::TooManyBuckets {
                max: MAX_BUCKETS,
                got: buckets.len(),
            });
        }

        for (i, b) in buckets.iter_mut().enumerate() {
            if b.withdrawals > b.max_withdrawals {
                return Err(BucketError::WithdrawalsExceedMax(i));
            }
            if b.rate_blocks == 0 {
                return Err(BucketError::ZeroRateBlocks(i));
            }
            b.block_stamp = block;
        }

        Ok(Self { buckets })
    }

    /// Same as [`Self::try_new`] over packed governance words.
    pub fn try_from_packed(words: &[U256], block: u64) -> Result<Self, BucketError> {
        Self::try_new(words.iter().copied().map(Bucket::unpack).collect(), block)
    }

    pub fn safe_mode(block: u64) -> Self {
        let mut bucket = Bucket::safe_mode();
        bucket.block_stamp = block;
        Self {
            buckets: vec![bucket],
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn get(&self, idx: usize) -> Option<&Bucket> {
        self.buckets.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Bucket> {
        self.buckets.get_mut(idx)
    }

    /// Lowest bucket whose ceiling covers `usd`.
    pub fn find(&self, usd: U256) -> Option<usize> {
        self.buckets.iter().position(|b| b.accepts(usd))
    }
}
