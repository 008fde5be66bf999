//! Intake of L1 user transactions.

use settle_primitives::{
    buf::Buf32,
    constants::{EXIT_IDX, LIMIT_L2TRANSFER_AMOUNT, LIMIT_LOAD_AMOUNT},
    float16::Float16,
    l1tx::L1Tx,
};
use settle_state::{errors::StateError, l1_queue::QueuePosition, rollup_state::RollupState};
use tracing::*;

use crate::{
    context::{CallContext, TokenVault},
    errors::L1TxError,
};

/// What a user submits, the sender being the caller.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct L1TxRequest {
    pub from_bjj_compressed: Buf32,
    pub from_idx: u64,
    pub load_amount_f: Float16,
    pub amount_f: Float16,
    pub token_id: u32,
    pub to_idx: u64,
}

/// Where the tx was queued, with its encoding.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct L1TxReceipt {
    pub queue_idx: u64,
    pub position: u32,
    pub l1_tx: Vec<u8>,
}

/// Checks the request against the current accounts and token registry.
pub fn validate_l1_tx(tx: &L1Tx, state: &RollupState) -> Result<(), L1TxError> {
    let accounts = state.accounts();
    if !state.tokens().is_registered(tx.token_id) {
        return Err(L1TxError::UnknownToken(tx.token_id));
    }

    let load_amount = tx.load_amount();
    if load_amount >= LIMIT_LOAD_AMOUNT {
        return Err(L1TxError::LoadAmountOverflow(load_amount));
    }
    let amount = tx.amount();
    if amount >= LIMIT_L2TRANSFER_AMOUNT {
        return Err(L1TxError::AmountOverflow(amount));
    }

    match tx.to_idx {
        0 => {
            if !amount.is_zero() {
                return Err(L1TxError::AmountMustBeZero);
            }
        }
        EXIT_IDX => {
            if !load_amount.is_zero() {
                return Err(L1TxError::LoadAmountMustBeZero);
            }
        }
        idx if !accounts.is_assigned(idx) => return Err(L1TxError::InvalidToIdx(idx)),
        _ => {}
    }

    if tx.from_idx == 0 {
        if tx.from_bjj_compressed.is_zero() {
            return Err(L1TxError::BjjRequired);
        }
    } else {
        if !accounts.is_assigned(tx.from_idx) {
            return Err(L1TxError::InvalidFromIdx(tx.from_idx));
        }
        if !tx.from_bjj_compressed.is_zero() {
            return Err(L1TxError::BjjMustBeZero);
        }
    }

    Ok(())
}

/// Validates a user request, takes its deposit into custody and queues it.
pub fn add_l1_transaction(
    state: &mut RollupState,
    vault: &mut impl TokenVault,
    ctx: &CallContext,
    req: L1TxRequest,
) -> Result<L1TxReceipt, L1TxError> {
    let tx = L1Tx {
        from_eth_addr: ctx.caller,
        from_bjj_compressed: req.from_bjj_compressed,
        from_idx: req.from_idx,
        load_amount_f: req.load_amount_f,
        amount_f: req.amount_f,
        token_id: req.token_id,
        to_idx: req.to_idx,
    };
    validate_l1_tx(&tx, state)?;
    let l1_tx = tx.encode()?.to_vec();

    // a full queue must fail before any funds move
    state.l1_queue().check_enqueue().map_err(StateError::from)?;

    let load_amount = tx.load_amount();
    if !load_amount.is_zero() {
        // registration was checked above
        let token = state
            .tokens()
            .get(tx.token_id)
            .ok_or(L1TxError::UnknownToken(tx.token_id))?
            .address;
        vault.pull(&ctx.caller, &token, load_amount)?;
    }

    let QueuePosition {
        queue_idx,
        position,
    } = state.enqueue_l1_tx(&tx)?;

    info!(
        %queue_idx,
        %position,
        from_idx = tx.from_idx,
        to_idx = tx.to_idx,
        token_id = tx.token_id,
        "queued L1 user tx"
    );

    Ok(L1TxReceipt {
        queue_idx,
        position,
        l1_tx,
    })
}
