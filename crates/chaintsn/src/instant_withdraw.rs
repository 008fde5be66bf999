//! Rate limiting of instant withdrawals.
//!
//! A withdrawal is valued in USD, mapped to the lowest bucket whose ceiling
//! covers it and spends one of that bucket's credits.  Anything that can't be
//! served instantly has to go through the delayed escrow instead.

use alloy_primitives::U256;
use settle_primitives::constants::EXCHANGE_MULTIPLIER;
use settle_state::bucket::{Bucket, BucketSet};
use tracing::*;

use crate::{context::ExchangeRateSource, errors::WithdrawalLimitError};

/// Largest decimals value `10^decimals` still fits 256 bits for.
const MAX_DECIMALS: u8 = 76;

pub struct WithdrawalBucketController<'r, R> {
    rates: &'r R,
}

impl<'r, R: ExchangeRateSource> WithdrawalBucketController<'r, R> {
    pub fn new(rates: &'r R) -> Self {
        Self { rates }
    }

    /// Values `amount` of a token in USD, zero if the token has no rate.
    pub fn token_to_usd(&self, token_id: u32, amount: U256) -> Result<U256, WithdrawalLimitError> {
        let (rate, decimals) = self
            .rates
            .token_rate(token_id)
            .ok_or(WithdrawalLimitError::UnknownToken(token_id))?;
        if rate == 0 {
            return Ok(U256::ZERO);
        }
        if decimals > MAX_DECIMALS {
            return Err(WithdrawalLimitError::InvalidDecimals(token_id));
        }

        let scale = U256::from(10u8).pow(U256::from(decimals));
        let usd = amount.saturating_mul(U256::from(rate)) / U256::from(EXCHANGE_MULTIPLIER) / scale;
        Ok(usd)
    }

    pub fn find_bucket(
        &self,
        buckets: &BucketSet,
        usd: U256,
    ) -> Result<usize, WithdrawalLimitError> {
        buckets
            .find(usd)
            .ok_or(WithdrawalLimitError::AmountExceedsMaxBucket(usd))
    }

    /// Works out the bucket write a withdrawal would make, without making it.
    ///
    /// Returns `None` when the withdrawal has no USD value and so is not
    /// limited at all.
    pub fn prepare(
        &self,
        buckets: &BucketSet,
        token_id: u32,
        amount: U256,
        block: u64,
    ) -> Result<Option<(usize, Bucket)>, WithdrawalLimitError> {
        let usd = self.token_to_usd(token_id, amount)?;
        if usd.is_zero() {
            return Ok(None);
        }

        let idx = self.find_bucket(buckets, usd)?;
        let Some(mut bucket) = buckets.get(idx).copied() else {
            return Err(WithdrawalLimitError::AmountExceedsMaxBucket(usd));
        };
        bucket.refill(block);

        if bucket.withdrawals == 0 {
            return Err(WithdrawalLimitError::InstantWithdrawalExhausted(idx));
        }
        bucket.withdrawals -= 1;

        Ok(Some((idx, bucket)))
    }

    /// Spends a credit for the withdrawal, returning the bucket it came from.
    ///
    /// `buckets` is only written when the withdrawal is allowed.
    pub fn consume(
        &self,
        buckets: &mut BucketSet,
        token_id: u32,
        amount: U256,
        block: u64,
    ) -> Result<Option<usize>, WithdrawalLimitError> {
        let Some((idx, bucket)) = self.prepare(buckets, token_id, amount, block)? else {
            return Ok(None);
        };
        if let Some(slot) = buckets.get_mut(idx) {
            *slot = bucket;
        }
        debug!(
            %token_id,
            bucket = idx,
            left = bucket.withdrawals,
            "consumed instant withdrawal credit"
        );
        Ok(Some(idx))
    }

    /// Checks if an instant withdrawal would currently go through.
    pub fn view_availability(
        &self,
        buckets: &BucketSet,
        token_id: u32,
        amount: U256,
        block: u64,
    ) -> bool {
        self.prepare(buckets, token_id, amount, block).is_ok()
    }
}
