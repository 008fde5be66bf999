//! Permissionless token listing against a fee paid to governance.

use alloy_primitives::U256;
use settle_primitives::{buf::Buf20, params::RollupParams};
use settle_state::{rollup_state::RollupState, tokens::TokenEntry};
use tracing::*;

use crate::{
    context::{CallContext, TokenVault},
    errors::TokenListingError,
};

/// Lists a token, charging the caller the current listing fee.
///
/// The fee is paid in the fee token to the governance address before the
/// token is registered, nothing is charged if the token can't be listed.
pub fn add_token(
    state: &mut RollupState,
    params: &RollupParams,
    vault: &mut impl TokenVault,
    ctx: &CallContext,
    entry: TokenEntry,
) -> Result<u32, TokenListingError> {
    if entry.address == Buf20::zero() {
        return Err(TokenListingError::NativeAddress);
    }
    state.tokens().check_register(&entry)?;

    let fee = state.fee_add_token();
    if fee > 0 {
        vault.transfer(
            &ctx.caller,
            &params.governance,
            &params.fee_token,
            U256::from(fee),
        )?;
    }

    let token_id = state.register_token(entry)?;
    info!(%token_id, address = %entry.address, %fee, "listed token");
    Ok(token_id)
}
