//! Batch forging, the proof-gated state transition.

use alloy_primitives::U256;
use settle_crypto::{
    bjj_auth::recover_authoriser,
    groth16::{Groth16Proof, VerifierSet},
};
use settle_primitives::{
    buf::{Buf20, Buf32},
    constants::L1_USER_TOTALBYTES,
    hash,
    l1tx::{decode_coordinator_txs, L1CoordinatorTx},
    params::RollupParams,
};
use settle_state::{batch::BatchRecord, rollup_state::RollupState};
use tracing::*;

use crate::{
    context::{CallContext, ForgeAuthorizer},
    errors::ForgeError,
    public_input::{build_l1_section, construct_circuit_input, pad_section, CircuitInput},
};

/// Data the coordinator submits with a batch.
#[derive(Clone, Debug, Default)]
pub struct ForgeBatchArgs {
    pub new_last_idx: u64,
    pub new_state_root: Buf32,
    pub new_exit_root: Buf32,

    /// Concatenated 101 byte coordinator txs.
    pub l1_coordinator_txs: Vec<u8>,

    pub l1l2_tx_data: Vec<u8>,
    pub fee_idx_coordinator: Vec<u8>,
    pub verifier_idx: usize,
    pub l1_batch: bool,
    pub proof: Groth16Proof,
}

/// Outcome of a successful forge.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForgeReceipt {
    pub batch_num: u64,
    pub l1_user_tx_count: u32,
    pub public_input: U256,
}

/// Forges a batch, advancing the rollup state if the proof checks out.
///
/// Either the whole transition is applied or `state` is left as it was.
pub fn forge_batch(
    state: &mut RollupState,
    params: &RollupParams,
    verifiers: &VerifierSet,
    authorizer: &impl ForgeAuthorizer,
    ctx: &CallContext,
    args: &ForgeBatchArgs,
) -> Result<ForgeReceipt, ForgeError> {
    if !authorizer.can_forge(&ctx.caller, ctx.block) {
        return Err(ForgeError::AuctionDenied(ctx.caller));
    }

    if !args.l1_batch {
        let deadline = state.last_l1l2_batch() + state.forge_l1l2_batch_timeout();
        if ctx.block >= deadline {
            return Err(ForgeError::L1BatchRequired {
                block: ctx.block,
                deadline,
            });
        }
    }

    state.accounts().check_advance(args.new_last_idx)?;

    let (vparams, verifier) = params
        .verifier(args.verifier_idx)
        .zip(verifiers.get(args.verifier_idx))
        .ok_or(ForgeError::InvalidVerifierIdx(args.verifier_idx))?;

    // L1 section
    let user_txs: &[u8] = if args.l1_batch {
        state.l1_queue().peek_to_forge()
    } else {
        &[]
    };
    let coordinator_txs = expand_coordinator_txs(params, &args.l1_coordinator_txs)?;
    let l1_data = build_l1_section(user_txs, &coordinator_txs)?;

    // L1/L2 and fee sections
    let l1l2_len = vparams.l1l2_data_len();
    let l1l2_data =
        pad_section(&args.l1l2_tx_data, l1l2_len).ok_or(ForgeError::L2TxOverflow {
            len: args.l1l2_tx_data.len(),
            max: l1l2_len,
        })?;
    let fee_len = vparams.fee_idx_len();
    let fee_idx_data = pad_section(&args.fee_idx_coordinator, fee_len).ok_or(
        ForgeError::InvalidFeeIdxCoordinatorLength {
            len: args.fee_idx_coordinator.len(),
            max: fee_len,
        },
    )?;

    let batch_num = state.batches().next_batch_num();
    let public_input = construct_circuit_input(&CircuitInput {
        old_last_idx: state.last_idx(),
        new_last_idx: args.new_last_idx,
        old_state_root: state.batches().state_root(),
        new_state_root: args.new_state_root,
        new_exit_root: args.new_exit_root,
        l1_data: &l1_data,
        l1l2_data: &l1l2_data,
        fee_idx_data: &fee_idx_data,
        chain_id: params.chain_id,
        batch_num,
    });

    if !verifier.verify_proof(&args.proof, &public_input) {
        warn!(%batch_num, verifier_idx = args.verifier_idx, "batch proof rejected");
        return Err(ForgeError::InvalidProof);
    }

    let l1_user_tx_count = (user_txs.len() / L1_USER_TOTALBYTES) as u32;

    // Everything below was checked above, the batch number and index
    // included.
    state.append_batch(BatchRecord {
        batch_num,
        state_root: args.new_state_root,
        exit_root: args.new_exit_root,
        l1l2_data_hash: hash::raw(&l1l2_data),
        block: ctx.block,
        is_l1_batch: args.l1_batch,
        l1_user_tx_count,
    })?;
    state.advance_last_idx(args.new_last_idx)?;
    if args.l1_batch {
        state.set_last_l1l2_batch(ctx.block);
        state.rotate_l1_queue();
    }

    info!(
        %batch_num,
        forger = %ctx.caller,
        block = ctx.block,
        l1_batch = args.l1_batch,
        %l1_user_tx_count,
        coordinator_txs = coordinator_txs.len() / L1_USER_TOTALBYTES,
        last_idx = args.new_last_idx,
        "forged batch"
    );

    Ok(ForgeReceipt {
        batch_num,
        l1_user_tx_count,
        public_input,
    })
}

/// Expands the coordinator txs into full L1 records.
///
/// Unsigned txs get the internal-only sender, signed ones the address
/// recovered from the account owner's authorization.
pub fn expand_coordinator_txs(params: &RollupParams, blob: &[u8]) -> Result<Vec<u8>, ForgeError> {
    let txs = decode_coordinator_txs(blob)?;
    let mut out = Vec::with_capacity(txs.len() * L1_USER_TOTALBYTES);
    for (idx, tx) in txs.iter().enumerate() {
        let from = coordinator_tx_sender(params, tx)
            .map_err(|source| ForgeError::InvalidCoordinatorSignature { idx, source })?;
        out.extend_from_slice(&tx.to_l1_tx(from).encode()?);
    }
    Ok(out)
}

fn coordinator_tx_sender(
    params: &RollupParams,
    tx: &L1CoordinatorTx,
) -> Result<Buf20, settle_crypto::bjj_auth::AuthError> {
    if !tx.is_signed() {
        return Ok(Buf20::INTERNAL_ONLY);
    }
    recover_authoriser(
        params.chain_id,
        params.rollup_address,
        &tx.bjj_compressed,
        tx.v,
        &tx.r,
        &tx.s,
    )
}
