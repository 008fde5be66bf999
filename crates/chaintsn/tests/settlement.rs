use alloy_primitives::U256;
use secp256k1::SecretKey;
use settle_chaintsn::{
    context::CallContext,
    errors::{ForgeError, ProviderError, TokenListingError, WithdrawError, WithdrawalLimitError},
    forge::{expand_coordinator_txs, forge_batch, ForgeBatchArgs, ForgeReceipt},
    governance::{safe_mode, update_fee_add_token},
    instant_withdraw::WithdrawalBucketController,
    l1_user_tx::add_l1_transaction,
    public_input::{
        build_l1_section, construct_circuit_input, construct_withdraw_input, pad_section,
        CircuitInput, WithdrawnLeaf,
    },
    token_listing::add_token,
    withdraw::{
        is_exit_claimed, withdraw_circuit, withdraw_merkle_proof, withdraw_multi_token,
        CircuitExitClaim, ExitClaim, MultiExitEntry, MultiTokenWithdrawal, Payout,
    },
};
use settle_crypto::{
    groth16::{Groth16Proof, NativeVerifier, ProofVerifier, VerifierSet},
    smt::{ExitLeaf, ExitTreeVerifier, NodeHasher, Sha256NodeHasher},
};
use settle_primitives::{
    buf::{Buf20, Buf32},
    constants::{L1_USER_TOTALBYTES, MAX_TOKEN_WITHDRAW},
    params::RollupParams,
};
use settle_state::{errors::StateError, rollup_state::RollupState, tokens::TokenEntry};
use settle_test_utils::{
    l1::{create_account_deposit, key_address, signed_coordinator_tx, unsigned_coordinator_tx},
    state::{genesis_state, test_params, TEST_FEE_ADD_TOKEN, TEST_L1L2_TIMEOUT},
    stubs::{InMemoryEscrow, InMemoryVault, RejectingVerifier, StubAuthorizer},
};

const FORGER: Buf20 = Buf20([0xf0; 20]);

fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u8))
}

struct Harness {
    state: RollupState,
    params: RollupParams,
    verifiers: VerifierSet,
    auth: StubAuthorizer,
    vault: InMemoryVault,
    escrow: InMemoryEscrow,
}

impl Harness {
    fn new() -> Self {
        settle_common::logging::init_for_tests();
        let mut verifiers = VerifierSet::new();
        verifiers.push(Box::new(NativeVerifier));
        Self {
            state: genesis_state(),
            params: test_params(),
            verifiers,
            auth: StubAuthorizer::only(FORGER),
            vault: InMemoryVault::default(),
            escrow: InMemoryEscrow::default(),
        }
    }

    fn batch_args(&self, l1_batch: bool) -> ForgeBatchArgs {
        let next = self.state.batches().next_batch_num() as u8;
        ForgeBatchArgs {
            new_last_idx: self.state.last_idx(),
            new_state_root: Buf32::from([next; 32]),
            new_exit_root: Buf32::zero(),
            l1_batch,
            ..Default::default()
        }
    }

    fn forge_with(&mut self, block: u64, args: &ForgeBatchArgs) -> Result<ForgeReceipt, ForgeError> {
        forge_batch(
            &mut self.state,
            &self.params,
            &self.verifiers,
            &self.auth,
            &CallContext::new(FORGER, block),
            args,
        )
    }

    fn forge(&mut self, block: u64, l1_batch: bool) -> Result<ForgeReceipt, ForgeError> {
        let args = self.batch_args(l1_batch);
        self.forge_with(block, &args)
    }

    /// Opens one ether account per bjj key for `user`, then forges an L2
    /// batch with `exit_root`, returning its number.
    fn exit_batch(&mut self, user: Buf20, bjjs: &[Buf32], exit_root: Buf32) -> u64 {
        self.vault
            .credit(user, Buf20::zero(), ether(bjjs.len() as u64));
        for bjj in bjjs {
            let req = create_account_deposit(*bjj, 0, ether(1));
            add_l1_transaction(&mut self.state, &mut self.vault, &CallContext::new(user, 1), req)
                .unwrap();
        }
        self.forge(2, true).unwrap();
        let mut args = self.batch_args(true);
        args.new_last_idx = 255 + bjjs.len() as u64;
        self.forge_with(3, &args).unwrap();

        let mut args = self.batch_args(false);
        args.new_exit_root = exit_root;
        self.forge_with(4, &args).unwrap().batch_num
    }
}

/// Accepts a single public input.
struct ExpectInput(U256);

impl ProofVerifier for ExpectInput {
    fn verify_proof(&self, _proof: &Groth16Proof, input: &U256) -> bool {
        *input == self.0
    }
}

#[test]
fn test_l1_txs_forged_in_order() {
    let mut h = Harness::new();
    let users = [Buf20::from([0xa1; 20]), Buf20::from([0xb2; 20]), Buf20::from([0xc3; 20])];

    let mut encoded = Vec::new();
    for (i, user) in users.iter().enumerate() {
        h.vault.credit(*user, Buf20::zero(), U256::from(1000u64));
        let req = create_account_deposit(Buf32::from([i as u8 + 1; 32]), 0, U256::from(1000u64));
        let rcpt = add_l1_transaction(&mut h.state, &mut h.vault, &CallContext::new(*user, 1), req)
            .unwrap();
        assert_eq!((rcpt.queue_idx, rcpt.position), (1, i as u32));
        encoded.extend_from_slice(&rcpt.l1_tx);
    }
    assert_eq!(h.vault.custody(&Buf20::zero()), U256::from(3000u64));
    assert_eq!(h.state.l1_queue().to_forge_idx(), 0);
    assert_eq!(h.state.l1_queue().filling_idx(), 1);

    // the first L1 batch flushes the empty genesis slot
    let first = h.forge(2, true).unwrap();
    assert_eq!(first.l1_user_tx_count, 0);
    assert_eq!(h.state.l1_queue().to_forge_idx(), 1);
    assert_eq!(h.state.l1_queue().filling_idx(), 2);
    assert_eq!(h.state.l1_queue().peek_to_forge(), &encoded[..]);

    let old_state_root = h.state.batches().state_root();
    let mut args = h.batch_args(true);
    args.new_last_idx = 258;
    args.new_exit_root = Buf32::from([0xee; 32]);
    let rcpt = h.forge_with(3, &args).unwrap();
    assert_eq!(rcpt.batch_num, 2);
    assert_eq!(rcpt.l1_user_tx_count, 3);
    assert_eq!(h.state.l1_queue().to_forge_idx(), 2);
    assert_eq!(h.state.l1_queue().filling_idx(), 3);

    let record = h.state.batches().get(2).unwrap();
    assert_eq!(record.state_root, args.new_state_root);
    assert_eq!(record.exit_root, Buf32::from([0xee; 32]));
    assert_eq!(record.block, 3);
    assert!(record.is_l1_batch);
    assert_eq!(record.l1_user_tx_count, 3);
    assert_eq!(h.state.batches().exit_root(2), Some(Buf32::from([0xee; 32])));

    let vp = h.params.verifier(0).unwrap();
    let l1 = build_l1_section(&encoded, &[]).unwrap();
    let l1l2 = pad_section(&[], vp.l1l2_data_len()).unwrap();
    let fee = pad_section(&[], vp.fee_idx_len()).unwrap();
    let expected = construct_circuit_input(&CircuitInput {
        old_last_idx: 255,
        new_last_idx: 258,
        old_state_root,
        new_state_root: args.new_state_root,
        new_exit_root: args.new_exit_root,
        l1_data: &l1,
        l1l2_data: &l1l2,
        fee_idx_data: &fee,
        chain_id: h.params.chain_id,
        batch_num: 2,
    });
    assert_eq!(rcpt.public_input, expected);
    assert_eq!(h.state.last_idx(), 258);
    assert_eq!(h.state.l1_queue().pending_txs(), 0);
}

#[test]
fn test_rejected_proof_changes_nothing() {
    let mut h = Harness::new();
    let user = Buf20::from([0xa1; 20]);
    let req = create_account_deposit(Buf32::from([1; 32]), 0, U256::ZERO);
    add_l1_transaction(&mut h.state, &mut h.vault, &CallContext::new(user, 1), req).unwrap();
    h.forge(2, true).unwrap();

    let mut rejecting = VerifierSet::new();
    rejecting.push(Box::new(RejectingVerifier));
    h.verifiers = rejecting;

    let before = h.state.clone();
    let commitment = before.compute_commitment();
    let res = h.forge(3, true);
    assert!(matches!(res, Err(ForgeError::InvalidProof)));
    assert_eq!(h.state, before);
    assert_eq!(h.state.compute_commitment(), commitment);
    assert_eq!(h.state.l1_queue().pending_txs(), 1);
}

#[test]
fn test_unauthorized_forger() {
    let mut h = Harness::new();
    let args = h.batch_args(true);
    let res = forge_batch(
        &mut h.state,
        &h.params,
        &h.verifiers,
        &h.auth,
        &CallContext::new(Buf20::from([0x01; 20]), 1),
        &args,
    );
    assert!(matches!(res, Err(ForgeError::AuctionDenied(_))));
    assert_eq!(h.state.batches().last_batch_num(), 0);
}

#[test]
fn test_l1_batch_timeout() {
    let mut h = Harness::new();
    assert_eq!(TEST_L1L2_TIMEOUT, 10);

    for block in 1..TEST_L1L2_TIMEOUT {
        h.forge(block, false).unwrap();
    }
    let res = h.forge(10, false);
    assert!(matches!(
        res,
        Err(ForgeError::L1BatchRequired {
            block: 10,
            deadline: 10
        })
    ));
    assert_eq!(h.state.batches().last_batch_num(), 9);

    h.forge(11, true).unwrap();
    assert_eq!(h.state.last_l1l2_batch(), 11);
    h.forge(20, false).unwrap();
    assert!(matches!(
        h.forge(21, false),
        Err(ForgeError::L1BatchRequired { .. })
    ));
}

#[test]
fn test_slot_and_batch_capacity() {
    let mut h = Harness::new();
    let user = Buf20::from([0xa1; 20]);
    let ctx = CallContext::new(user, 1);

    for i in 0..129u32 {
        let mut bjj = [1u8; 32];
        bjj[..4].copy_from_slice(&i.to_be_bytes());
        let req = create_account_deposit(Buf32::from(bjj), 0, U256::ZERO);
        let rcpt = add_l1_transaction(&mut h.state, &mut h.vault, &ctx, req).unwrap();
        if i < 128 {
            assert_eq!((rcpt.queue_idx, rcpt.position), (1, i));
        } else {
            assert_eq!((rcpt.queue_idx, rcpt.position), (2, 0));
        }
    }

    h.forge(2, true).unwrap();

    // 128 queued user txs leave room for exactly 128 coordinator txs
    let coord: Vec<u8> = (0..129u8)
        .flat_map(|i| unsigned_coordinator_tx(Buf32::from([i; 32]), 0).encode())
        .collect();
    let mut args = h.batch_args(true);
    args.l1_coordinator_txs = coord.clone();
    assert!(matches!(
        h.forge_with(3, &args),
        Err(ForgeError::L1TxOverflow(257))
    ));

    args.l1_coordinator_txs = coord[..128 * 101].to_vec();
    let rcpt = h.forge_with(3, &args).unwrap();
    assert_eq!(rcpt.l1_user_tx_count, 128);
    assert_eq!(h.state.last_batch().l1_user_tx_count, 128);

    // the overflowing request is next in line
    assert_eq!(h.state.l1_queue().to_forge_idx(), 2);
    assert_eq!(
        h.state.l1_queue().peek_to_forge().len(),
        L1_USER_TOTALBYTES
    );
}

#[test]
fn test_signed_coordinator_tx() {
    let mut h = Harness::new();
    let key = SecretKey::from_slice(&[0x5e; 32]).unwrap();
    let bjj = Buf32::from([0x33; 32]);

    let tx = signed_coordinator_tx(&h.params, &key, bjj, 0);
    let expanded = expand_coordinator_txs(&h.params, &tx.encode()).unwrap();
    assert_eq!(&expanded[..20], key_address(&key).as_slice());
    assert_eq!(&expanded[20..52], bjj.as_slice());

    // the signature doesn't cover another key
    let mut other = tx.clone();
    other.bjj_compressed = Buf32::from([0x34; 32]);
    let expanded = expand_coordinator_txs(&h.params, &other.encode()).unwrap();
    assert_ne!(&expanded[..20], key_address(&key).as_slice());

    let mut args = h.batch_args(true);
    args.l1_coordinator_txs = tx.encode().to_vec();
    h.forge_with(1, &args).unwrap();
}

/// Two exit leaves for `owner` at idx 256 and 257, and the siblings of each.
fn two_leaf_exit_tree(
    tree: &ExitTreeVerifier<Sha256NodeHasher>,
    owner: Buf20,
    bjj: Buf32,
    amount: U256,
) -> (U256, [U256; 2]) {
    let h = tree.hasher();
    let leaf = ExitLeaf {
        token_id: 0,
        balance: amount,
        bjj_compressed: bjj.to_u256(),
        eth_addr: owner.into(),
    }
    .hash(h);
    let f256 = h.hash_final_node(U256::from(256u64), leaf);
    let f257 = h.hash_final_node(U256::from(257u64), leaf);
    (h.hash_node(f256, f257), [f257, f256])
}

#[test]
fn test_withdraw_flows() {
    let mut h = Harness::new();
    let user = Buf20::from([0xa1; 20]);
    let bjj = Buf32::from([0x44; 32]);
    let tree = ExitTreeVerifier::new(Sha256NodeHasher);

    h.vault.credit(user, Buf20::zero(), ether(2));
    for _ in 0..2 {
        let req = create_account_deposit(bjj, 0, ether(1));
        add_l1_transaction(&mut h.state, &mut h.vault, &CallContext::new(user, 1), req).unwrap();
    }
    assert_eq!(h.vault.balance_of(&user, &Buf20::zero()), U256::ZERO);

    h.forge(2, true).unwrap();
    let mut args = h.batch_args(true);
    args.new_last_idx = 257;
    h.forge_with(3, &args).unwrap();

    // both accounts exit everything in batch 3
    let (root, siblings) = two_leaf_exit_tree(&tree, user, bjj, ether(1));
    let mut args = h.batch_args(false);
    args.new_exit_root = Buf32::from(root);
    let exit_batch = h.forge_with(4, &args).unwrap().batch_num;

    let claim = |idx: u64, instant: bool| ExitClaim {
        token_id: 0,
        amount: ether(1),
        bjj_compressed: bjj,
        batch_num: exit_batch,
        siblings: vec![siblings[(idx - 256) as usize]],
        idx,
        instant,
    };
    let ctx = CallContext::new(user, 5);

    // 2000 USD lands in the second bucket, which has one credit
    let paid = withdraw_merkle_proof(
        &mut h.state,
        &tree,
        &mut h.vault,
        &mut h.escrow,
        &ctx,
        &claim(256, true),
    )
    .unwrap();
    assert_eq!(paid, Payout::Instant);
    assert_eq!(h.vault.balance_of(&user, &Buf20::zero()), ether(1));
    assert_eq!(h.state.buckets().get(1).unwrap().withdrawals, 0);

    let res = withdraw_merkle_proof(
        &mut h.state,
        &tree,
        &mut h.vault,
        &mut h.escrow,
        &ctx,
        &claim(257, true),
    );
    assert!(matches!(
        res,
        Err(WithdrawError::Limit(
            WithdrawalLimitError::InstantWithdrawalExhausted(1)
        ))
    ));
    assert!(!is_exit_claimed(&h.state, exit_batch, 257));

    let paid = withdraw_merkle_proof(
        &mut h.state,
        &tree,
        &mut h.vault,
        &mut h.escrow,
        &ctx,
        &claim(257, false),
    )
    .unwrap();
    assert_eq!(paid, Payout::Delayed);
    assert_eq!(h.escrow.deposits.len(), 1);
    assert_eq!(h.escrow.deposits[0].recipient, user);
    assert_eq!(h.escrow.deposits[0].amount, ether(1));
    assert!(is_exit_claimed(&h.state, exit_batch, 257));

    let res = withdraw_merkle_proof(
        &mut h.state,
        &tree,
        &mut h.vault,
        &mut h.escrow,
        &ctx,
        &claim(256, false),
    );
    assert!(matches!(res, Err(WithdrawError::WithdrawAlreadyDone { .. })));
}

#[test]
fn test_safe_mode_stops_instant_withdrawals() {
    let mut h = Harness::new();
    let available = |state: &RollupState, block| {
        WithdrawalBucketController::new(state.tokens()).view_availability(
            state.buckets(),
            0,
            ether(1),
            block,
        )
    };
    assert!(available(&h.state, 1));

    let gov = CallContext::new(h.params.governance, 1);
    safe_mode(&mut h.state, &h.params, &gov).unwrap();
    assert!(!available(&h.state, 1));
    assert!(!available(&h.state, 10_000));
}

#[test]
fn test_circuit_withdraw_shares_nullifier() {
    let mut h = Harness::new();
    let user = Buf20::from([0xa1; 20]);
    let root = Buf32::from([0x5a; 32]);
    let exit_batch = h.exit_batch(user, &[Buf32::from([0x44; 32])], root);

    let claim = CircuitExitClaim {
        token_id: 0,
        amount: ether(1),
        batch_num: exit_batch,
        idx: 256,
        instant: true,
        proof: Groth16Proof::default(),
    };
    let verifier = ExpectInput(construct_withdraw_input(
        root,
        user,
        &[WithdrawnLeaf {
            token_id: 0,
            amount: ether(1),
            idx: 256,
        }],
    ));

    // claiming more than the proven leaf
    let greedy = CircuitExitClaim {
        amount: ether(2),
        ..claim.clone()
    };
    let ctx = CallContext::new(user, 5);
    let res = withdraw_circuit(&mut h.state, &verifier, &mut h.vault, &mut h.escrow, &ctx, &greedy);
    assert!(matches!(res, Err(WithdrawError::InvalidWithdrawProof)));
    assert_eq!(h.vault.custody(&Buf20::zero()), ether(1));

    let paid =
        withdraw_circuit(&mut h.state, &verifier, &mut h.vault, &mut h.escrow, &ctx, &claim).unwrap();
    assert_eq!(paid, Payout::Instant);
    assert_eq!(h.vault.balance_of(&user, &Buf20::zero()), ether(1));
    assert_eq!(h.state.buckets().get(1).unwrap().withdrawals, 0);
    assert!(is_exit_claimed(&h.state, exit_batch, 256));

    // the merkle path can't claim the same leaf again
    let tree = ExitTreeVerifier::new(Sha256NodeHasher);
    let res = withdraw_merkle_proof(
        &mut h.state,
        &tree,
        &mut h.vault,
        &mut h.escrow,
        &ctx,
        &ExitClaim {
            token_id: 0,
            amount: ether(1),
            bjj_compressed: Buf32::from([0x44; 32]),
            batch_num: exit_batch,
            siblings: Vec::new(),
            idx: 256,
            instant: false,
        },
    );
    assert!(matches!(
        res,
        Err(WithdrawError::WithdrawAlreadyDone { idx: 256, .. })
    ));
}

#[test]
fn test_multi_token_withdraw_in_parts() {
    let mut h = Harness::new();
    let user = Buf20::from([0xa1; 20]);
    let exit_batch = h.exit_batch(
        user,
        &[Buf32::from([0x44; 32]), Buf32::from([0x45; 32])],
        Buf32::from([0x5b; 32]),
    );
    let mut verifiers = VerifierSet::new();
    for _ in 0..MAX_TOKEN_WITHDRAW {
        verifiers.push(Box::new(NativeVerifier));
    }
    let part = |idx: u64, withdraw: U256| MultiExitEntry {
        token_id: 0,
        amount: ether(1),
        amount_withdraw: withdraw,
        idx,
        instant: false,
    };
    let ctx = CallContext::new(user, 5);
    let half = ether(1) / U256::from(2u8);

    let req = MultiTokenWithdrawal {
        batch_num: exit_batch,
        entries: vec![part(256, half), part(257, ether(1))],
        proof: Groth16Proof::default(),
    };
    let paid =
        withdraw_multi_token(&mut h.state, &verifiers, &mut h.vault, &mut h.escrow, &ctx, &req)
            .unwrap();
    assert_eq!(paid, vec![Payout::Delayed, Payout::Delayed]);
    assert_eq!(h.escrow.deposits.len(), 2);
    assert_eq!(h.escrow.deposits[0].amount, half);
    assert_eq!(h.escrow.deposits[1].amount, ether(1));

    // 257 is drained, 256 has half left
    let req = MultiTokenWithdrawal {
        entries: vec![part(257, U256::from(1u8))],
        ..req
    };
    let res = withdraw_multi_token(&mut h.state, &verifiers, &mut h.vault, &mut h.escrow, &ctx, &req);
    assert!(matches!(
        res,
        Err(WithdrawError::State(StateError::ExitOverdrawn { idx: 257, .. }))
    ));

    let req = MultiTokenWithdrawal {
        entries: vec![part(256, half)],
        ..req
    };
    withdraw_multi_token(&mut h.state, &verifiers, &mut h.vault, &mut h.escrow, &ctx, &req)
        .unwrap();
    assert_eq!(h.state.exit_accumulator().withdrawn(256), ether(1));
    assert_eq!(h.escrow.deposits.len(), 3);

    // the per-batch nullifier is untouched by partial withdrawals
    assert!(!is_exit_claimed(&h.state, exit_batch, 256));
}

#[test]
fn test_listed_token_takes_deposits() {
    let mut h = Harness::new();
    let lister = Buf20::from([0x77; 20]);
    let usdc = TokenEntry {
        address: Buf20::from([0x0c; 20]),
        decimals: 6,
    };
    let fee = U256::from(TEST_FEE_ADD_TOKEN);
    h.vault.credit(lister, h.params.fee_token, fee);

    let ctx = CallContext::new(lister, 1);
    let token_id = add_token(&mut h.state, &h.params, &mut h.vault, &ctx, usdc).unwrap();
    assert_eq!(token_id, 1);
    assert_eq!(h.vault.balance_of(&lister, &h.params.fee_token), U256::ZERO);
    assert_eq!(h.vault.balance_of(&h.params.governance, &h.params.fee_token), fee);

    // no fee left for a second listing
    let before = h.state.clone();
    let dai = TokenEntry {
        address: Buf20::from([0x0d; 20]),
        decimals: 18,
    };
    let res = add_token(&mut h.state, &h.params, &mut h.vault, &ctx, dai);
    assert!(matches!(
        res,
        Err(TokenListingError::Fee(ProviderError::InsufficientBalance))
    ));
    assert_eq!(h.state, before);

    // until governance waives it
    let gov = CallContext::new(h.params.governance, 2);
    update_fee_add_token(&mut h.state, &h.params, &gov, 0).unwrap();
    assert_eq!(add_token(&mut h.state, &h.params, &mut h.vault, &ctx, dai).unwrap(), 2);

    h.vault.credit(lister, usdc.address, U256::from(5_000_000u64));
    let req = create_account_deposit(Buf32::from([0x46; 32]), token_id, U256::from(5_000_000u64));
    add_l1_transaction(&mut h.state, &mut h.vault, &ctx, req).unwrap();
    assert_eq!(h.vault.custody(&usdc.address), U256::from(5_000_000u64));
}
