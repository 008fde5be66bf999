//! Builders for L1 user requests and coordinator txs.

use alloy_primitives::{keccak256, Address, U256};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use settle_chaintsn::l1_user_tx::L1TxRequest;
use settle_crypto::bjj_auth::authorisation_digest;
use settle_primitives::{
    buf::{Buf20, Buf32},
    float16::Float16,
    l1tx::{L1CoordinatorTx, L1Tx},
    params::RollupParams,
};

use crate::ArbitraryGenerator;

fn exact(amount: U256) -> Float16 {
    Float16::from_fix_exact(amount).expect("amount must be representable as float16")
}

/// New account for the caller, with an initial deposit.
pub fn create_account_deposit(bjj: Buf32, token_id: u32, load_amount: U256) -> L1TxRequest {
    L1TxRequest {
        from_bjj_compressed: bjj,
        from_idx: 0,
        load_amount_f: exact(load_amount),
        amount_f: Float16::ZERO,
        token_id,
        to_idx: 0,
    }
}

/// Top up of an existing account.
pub fn deposit(from_idx: u64, token_id: u32, load_amount: U256) -> L1TxRequest {
    L1TxRequest {
        from_bjj_compressed: Buf32::zero(),
        from_idx,
        load_amount_f: exact(load_amount),
        amount_f: Float16::ZERO,
        token_id,
        to_idx: 0,
    }
}

/// Forced exit of `amount` from an existing account.
pub fn force_exit(from_idx: u64, token_id: u32, amount: U256) -> L1TxRequest {
    L1TxRequest {
        from_bjj_compressed: Buf32::zero(),
        from_idx,
        load_amount_f: Float16::ZERO,
        amount_f: exact(amount),
        token_id,
        to_idx: 1,
    }
}

/// Arbitrary account-creation tx, valid on a fresh state.
pub fn gen_create_account_tx(gen: &ArbitraryGenerator) -> L1Tx {
    let mut tx: L1Tx = gen.generate();
    tx.from_idx = 0;
    tx.to_idx = 0;
    tx.token_id = 0;
    tx.amount_f = Float16::ZERO;
    // keep the deposit well under the load amount limit
    tx.load_amount_f = Float16::from_raw(tx.load_amount_f.raw() & 0x3ff);
    if tx.from_bjj_compressed.is_zero() {
        tx.from_bjj_compressed = Buf32::from([1; 32]);
    }
    tx
}

/// Coordinator tx creating an account without the owner's signature.
pub fn unsigned_coordinator_tx(bjj: Buf32, token_id: u32) -> L1CoordinatorTx {
    L1CoordinatorTx {
        v: 0,
        r: Buf32::zero(),
        s: Buf32::zero(),
        bjj_compressed: bjj,
        token_id,
    }
}

/// Coordinator tx carrying `key`'s authorization of `bjj`.
pub fn signed_coordinator_tx(
    params: &RollupParams,
    key: &SecretKey,
    bjj: Buf32,
    token_id: u32,
) -> L1CoordinatorTx {
    let digest = authorisation_digest(params.chain_id, params.rollup_address, &bjj);
    let (recid, bytes) = SECP256K1
        .sign_ecdsa_recoverable(&Message::from_digest(digest.0), key)
        .serialize_compact();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..]);

    L1CoordinatorTx {
        v: 27 + recid.to_i32() as u8,
        r: Buf32::from(r),
        s: Buf32::from(s),
        bjj_compressed: bjj,
        token_id,
    }
}

/// Address controlled by `key`.
pub fn key_address(key: &SecretKey) -> Buf20 {
    let pk = PublicKey::from_secret_key(SECP256K1, key).serialize_uncompressed();
    Buf20::from(Address::from_slice(&keccak256(&pk[1..])[12..]))
}
