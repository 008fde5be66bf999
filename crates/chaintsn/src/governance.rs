//! Parameter updates reserved to the governance address.

use alloy_primitives::U256;
use settle_primitives::{
    buf::Buf20,
    constants::{ABSOLUTE_MAX_L1L2BATCHTIMEOUT, MAX_WITHDRAWAL_DELAY},
    params::RollupParams,
};
use settle_state::{bucket::BucketSet, rollup_state::RollupState};
use tracing::*;

use crate::{
    context::{CallContext, WithdrawalEscrow},
    errors::GovernanceError,
};

fn ensure_governance(params: &RollupParams, ctx: &CallContext) -> Result<(), GovernanceError> {
    if ctx.caller != params.governance {
        warn!(caller = %ctx.caller, "rejected governance call");
        return Err(GovernanceError::OnlyGovernance(ctx.caller));
    }
    Ok(())
}

pub fn update_forge_l1l2_batch_timeout(
    state: &mut RollupState,
    params: &RollupParams,
    ctx: &CallContext,
    timeout: u64,
) -> Result<(), GovernanceError> {
    ensure_governance(params, ctx)?;
    if timeout > ABSOLUTE_MAX_L1L2BATCHTIMEOUT {
        return Err(GovernanceError::TimeoutTooLarge(timeout));
    }
    state.set_forge_l1l2_batch_timeout(timeout);
    info!(%timeout, "updated forge L1/L2 batch timeout");
    Ok(())
}

/// Replaces every bucket with the packed words given.  Refill stamps restart
/// at the current block.
pub fn update_bucket_parameters(
    state: &mut RollupState,
    params: &RollupParams,
    ctx: &CallContext,
    packed: &[U256],
) -> Result<(), GovernanceError> {
    ensure_governance(params, ctx)?;
    let set = BucketSet::try_from_packed(packed, ctx.block)?;
    state.set_buckets(set);
    info!(buckets = packed.len(), block = ctx.block, "updated buckets");
    Ok(())
}

pub fn update_token_exchange(
    state: &mut RollupState,
    params: &RollupParams,
    ctx: &CallContext,
    addresses: &[Buf20],
    rates: &[u64],
) -> Result<(), GovernanceError> {
    ensure_governance(params, ctx)?;
    if addresses.len() != rates.len() {
        return Err(GovernanceError::LengthMismatch {
            addresses: addresses.len(),
            rates: rates.len(),
        });
    }
    for (addr, rate) in addresses.iter().zip(rates) {
        state.set_exchange_rate(*addr, *rate);
    }
    debug!(tokens = addresses.len(), "updated exchange rates");
    Ok(())
}

/// Forwards a new delay for non instant withdrawals to the escrow.
pub fn update_withdrawal_delay(
    params: &RollupParams,
    escrow: &mut impl WithdrawalEscrow,
    ctx: &CallContext,
    delay: u64,
) -> Result<(), GovernanceError> {
    ensure_governance(params, ctx)?;
    if delay > MAX_WITHDRAWAL_DELAY {
        return Err(GovernanceError::DelayTooLarge(delay));
    }
    escrow.set_withdrawal_delay(delay)?;
    info!(%delay, "updated withdrawal delay");
    Ok(())
}

/// Stops all instant withdrawals by leaving a single bucket with no credits.
pub fn safe_mode(
    state: &mut RollupState,
    params: &RollupParams,
    ctx: &CallContext,
) -> Result<(), GovernanceError> {
    ensure_governance(params, ctx)?;
    state.set_buckets(BucketSet::safe_mode(ctx.block));
    warn!(block = ctx.block, "entered safe mode");
    Ok(())
}

/// Sets the fee, in the fee token, charged for listing a token.
pub fn update_fee_add_token(
    state: &mut RollupState,
    params: &RollupParams,
    ctx: &CallContext,
    fee: u128,
) -> Result<(), GovernanceError> {
    ensure_governance(params, ctx)?;
    state.set_fee_add_token(fee);
    info!(%fee, "updated token listing fee");
    Ok(())
}
