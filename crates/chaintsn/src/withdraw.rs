//! Withdrawal of exited balances against a batch's exit root.
//!
//! Three ways to prove an exit: a sparse merkle path to a single leaf, a
//! proof over a single leaf, or a proof over up to four cumulative exit
//! leaves of the same owner.  The first two claim a leaf once per batch, the
//! last one withdraws partial amounts from the running exit balance of each
//! account.

use std::collections::BTreeMap;

use alloy_primitives::U256;
use settle_crypto::{
    groth16::{Groth16Proof, ProofVerifier, VerifierSet},
    smt::{ExitLeaf, ExitTreeVerifier, NodeHasher},
};
use settle_primitives::{
    buf::{Buf20, Buf32},
    constants::{LIMIT_L2TRANSFER_AMOUNT, MAX_TOKEN_WITHDRAW},
};
use settle_state::{bucket::Bucket, rollup_state::RollupState};
use tracing::*;

use crate::{
    context::{CallContext, TokenVault, WithdrawalEscrow},
    errors::{ProviderError, WithdrawError},
    instant_withdraw::WithdrawalBucketController,
    public_input::{construct_withdraw_input, WithdrawnLeaf},
};

/// A claim on an exit leaf, the leaf's owner being the caller.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExitClaim {
    pub token_id: u32,
    pub amount: U256,
    pub bjj_compressed: Buf32,
    pub batch_num: u64,
    pub siblings: Vec<U256>,
    pub idx: u64,
    pub instant: bool,
}

/// A claim on an exit leaf backed by a withdrawal proof instead of a path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CircuitExitClaim {
    pub token_id: u32,
    pub amount: U256,
    pub batch_num: u64,
    pub idx: u64,
    pub instant: bool,
    pub proof: Groth16Proof,
}

/// Part of an account's cumulative exit to withdraw.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MultiExitEntry {
    pub token_id: u32,

    /// Cumulative exit balance of the leaf.
    pub amount: U256,

    /// How much of it to withdraw now.
    pub amount_withdraw: U256,

    pub idx: u64,
    pub instant: bool,
}

/// Withdrawal of several leaves from the exit tree of one batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MultiTokenWithdrawal {
    pub batch_num: u64,
    pub entries: Vec<MultiExitEntry>,
    pub proof: Groth16Proof,
}

/// How a successful withdrawal was paid out.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Payout {
    Instant,
    Delayed,
}

/// Checks if the exit leaf `idx` of batch `batch_num` was already withdrawn.
pub fn is_exit_claimed(state: &RollupState, batch_num: u64, idx: u64) -> bool {
    state.exit_nullifiers().is_claimed(batch_num, idx)
}

fn check_amount(amount: U256) -> Result<(), WithdrawError> {
    if amount >= LIMIT_L2TRANSFER_AMOUNT {
        return Err(WithdrawError::AmountOverflow(amount));
    }
    Ok(())
}

fn token_address(state: &RollupState, token_id: u32) -> Result<Buf20, WithdrawError> {
    Ok(state
        .tokens()
        .get(token_id)
        .ok_or(WithdrawError::UnknownToken(token_id))?
        .address)
}

fn exit_root(state: &RollupState, batch_num: u64) -> Result<Buf32, WithdrawError> {
    state
        .batches()
        .exit_root(batch_num)
        .ok_or(WithdrawError::UnknownExitRoot(batch_num))
}

fn ensure_unclaimed(state: &RollupState, batch_num: u64, idx: u64) -> Result<(), WithdrawError> {
    if is_exit_claimed(state, batch_num, idx) {
        return Err(WithdrawError::WithdrawAlreadyDone { batch_num, idx });
    }
    Ok(())
}

/// Bucket write an instant withdrawal would make, `None` for delayed ones
/// and for withdrawals without USD value.
fn prepare_instant(
    state: &RollupState,
    token_id: u32,
    amount: U256,
    instant: bool,
    block: u64,
) -> Result<Option<(usize, Bucket)>, WithdrawError> {
    if !instant {
        return Ok(None);
    }
    Ok(WithdrawalBucketController::new(state.tokens()).prepare(
        state.buckets(),
        token_id,
        amount,
        block,
    )?)
}

fn pay_out(
    vault: &mut impl TokenVault,
    escrow: &mut impl WithdrawalEscrow,
    to: &Buf20,
    token: &Buf20,
    amount: U256,
    instant: bool,
) -> Result<Payout, ProviderError> {
    if instant {
        vault.push(to, token, amount)?;
        Ok(Payout::Instant)
    } else {
        escrow.deposit(to, token, amount)?;
        Ok(Payout::Delayed)
    }
}

/// Records a single leaf claim once its payout went through.
fn commit_claim(
    state: &mut RollupState,
    batch_num: u64,
    idx: u64,
    bucket: Option<(usize, Bucket)>,
) -> Result<(), WithdrawError> {
    if let Some((i, b)) = bucket {
        state.put_bucket(i, b)?;
    }
    state.claim_exit(batch_num, idx)?;
    Ok(())
}

/// Withdraws an exited balance, instantly if the buckets allow it or through
/// the escrow otherwise.
///
/// The nullifier and bucket writes are only made once the payout went
/// through.
pub fn withdraw_merkle_proof<H: NodeHasher>(
    state: &mut RollupState,
    exit_tree: &ExitTreeVerifier<H>,
    vault: &mut impl TokenVault,
    escrow: &mut impl WithdrawalEscrow,
    ctx: &CallContext,
    claim: &ExitClaim,
) -> Result<Payout, WithdrawError> {
    check_amount(claim.amount)?;
    let token = token_address(state, claim.token_id)?;
    let exit_root = exit_root(state, claim.batch_num)?;
    ensure_unclaimed(state, claim.batch_num, claim.idx)?;

    let leaf = ExitLeaf {
        token_id: claim.token_id,
        balance: claim.amount,
        bjj_compressed: claim.bjj_compressed.to_u256(),
        eth_addr: ctx.caller.into(),
    };
    let leaf_hash = leaf.hash(exit_tree.hasher());
    if !exit_tree.verify(exit_root.to_u256(), &claim.siblings, claim.idx, leaf_hash) {
        return Err(WithdrawError::SmtProofInvalid);
    }

    let bucket = prepare_instant(state, claim.token_id, claim.amount, claim.instant, ctx.block)?;
    let payout = pay_out(vault, escrow, &ctx.caller, &token, claim.amount, claim.instant)?;
    commit_claim(state, claim.batch_num, claim.idx, bucket)?;

    info!(
        batch_num = claim.batch_num,
        idx = claim.idx,
        token_id = claim.token_id,
        amount = %claim.amount,
        ?payout,
        "withdrew exit"
    );
    Ok(payout)
}

/// Same as [`withdraw_merkle_proof`] with a withdrawal proof standing in for
/// the merkle path.
pub fn withdraw_circuit(
    state: &mut RollupState,
    verifier: &dyn ProofVerifier,
    vault: &mut impl TokenVault,
    escrow: &mut impl WithdrawalEscrow,
    ctx: &CallContext,
    claim: &CircuitExitClaim,
) -> Result<Payout, WithdrawError> {
    check_amount(claim.amount)?;
    let token = token_address(state, claim.token_id)?;
    let exit_root = exit_root(state, claim.batch_num)?;
    ensure_unclaimed(state, claim.batch_num, claim.idx)?;

    let input = construct_withdraw_input(
        exit_root,
        ctx.caller,
        &[WithdrawnLeaf {
            token_id: claim.token_id,
            amount: claim.amount,
            idx: claim.idx,
        }],
    );
    if !verifier.verify_proof(&claim.proof, &input) {
        warn!(batch_num = claim.batch_num, idx = claim.idx, "withdrawal proof rejected");
        return Err(WithdrawError::InvalidWithdrawProof);
    }

    let bucket = prepare_instant(state, claim.token_id, claim.amount, claim.instant, ctx.block)?;
    let payout = pay_out(vault, escrow, &ctx.caller, &token, claim.amount, claim.instant)?;
    commit_claim(state, claim.batch_num, claim.idx, bucket)?;

    info!(
        batch_num = claim.batch_num,
        idx = claim.idx,
        token_id = claim.token_id,
        amount = %claim.amount,
        ?payout,
        "withdrew exit with proof"
    );
    Ok(payout)
}

/// Withdraws parts of up to [`MAX_TOKEN_WITHDRAW`] cumulative exit balances
/// under one proof, checked by the verifier in slot `entries - 1`.
///
/// Every check runs before the first payout.  Entries are then paid out in
/// order, each one recorded right after its payout, so a failing payout
/// leaves the earlier entries withdrawn.
pub fn withdraw_multi_token(
    state: &mut RollupState,
    verifiers: &VerifierSet,
    vault: &mut impl TokenVault,
    escrow: &mut impl WithdrawalEscrow,
    ctx: &CallContext,
    req: &MultiTokenWithdrawal,
) -> Result<Vec<Payout>, WithdrawError> {
    let n = req.entries.len();
    if n == 0 || n > MAX_TOKEN_WITHDRAW {
        return Err(WithdrawError::InvalidLeafCount {
            got: n,
            max: MAX_TOKEN_WITHDRAW,
        });
    }
    let verifier = verifiers
        .get(n - 1)
        .ok_or(WithdrawError::NoWithdrawVerifier(n))?;
    let exit_root = exit_root(state, req.batch_num)?;

    let mut tokens = Vec::with_capacity(n);
    let mut pending: BTreeMap<u64, U256> = BTreeMap::new();
    for e in &req.entries {
        check_amount(e.amount)?;
        tokens.push(token_address(state, e.token_id)?);

        let so_far = pending.entry(e.idx).or_default();
        let with_this = so_far.saturating_add(e.amount_withdraw);
        state
            .exit_accumulator()
            .check_add(e.idx, with_this, e.amount)?;
        *so_far = with_this;
    }

    let leaves: Vec<_> = req
        .entries
        .iter()
        .map(|e| WithdrawnLeaf {
            token_id: e.token_id,
            amount: e.amount,
            idx: e.idx,
        })
        .collect();
    let input = construct_withdraw_input(exit_root, ctx.caller, &leaves);
    if !verifier.verify_proof(&req.proof, &input) {
        warn!(batch_num = req.batch_num, leaves = n, "multi token withdrawal proof rejected");
        return Err(WithdrawError::InvalidWithdrawProof);
    }

    // Bucket writes, worked out in order on a copy of the buckets.
    let controller = WithdrawalBucketController::new(state.tokens());
    let mut buckets = state.buckets().clone();
    let mut bucket_writes = Vec::with_capacity(n);
    for e in &req.entries {
        let write = if e.instant {
            controller
                .consume(&mut buckets, e.token_id, e.amount_withdraw, ctx.block)?
                .and_then(|i| buckets.get(i).map(|b| (i, *b)))
        } else {
            None
        };
        bucket_writes.push(write);
    }

    let mut payouts = Vec::with_capacity(n);
    for (i, (e, (token, write))) in req
        .entries
        .iter()
        .zip(tokens.iter().zip(bucket_writes))
        .enumerate()
    {
        let payout = pay_out(vault, escrow, &ctx.caller, token, e.amount_withdraw, e.instant)
            .map_err(|source| match i {
                0 => WithdrawError::Payout(source),
                paid => WithdrawError::PartialPayout { paid, source },
            })?;

        if let Some((bi, b)) = write {
            state.put_bucket(bi, b)?;
        }
        state.accumulate_exit(e.idx, e.amount_withdraw, e.amount)?;

        debug!(
            idx = e.idx,
            token_id = e.token_id,
            amount = %e.amount_withdraw,
            ?payout,
            "withdrew part of exit"
        );
        payouts.push(payout);
    }

    info!(batch_num = req.batch_num, leaves = n, "withdrew multi token exit");
    Ok(payouts)
}
