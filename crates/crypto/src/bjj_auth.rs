//! Recovery of the account owner behind a coordinator account-creation tx.
//!
//! The owner signs an EIP-712 `Authorise` message binding their BabyJubJub
//! key to the rollup, and the coordinator relays the signature.

use alloy_primitives::{keccak256, Address, Signature, SignatureError, B256, U256};
use thiserror::Error;

use settle_primitives::buf::{Buf20, Buf32};

const EIP712_DOMAIN_TYPE: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const AUTHORISE_TYPE: &[u8] = b"Authorise(string Provider,string Authorisation,bytes32 BJJKey)";
const DOMAIN_NAME: &[u8] = b"Hermez Network";
const DOMAIN_VERSION: &[u8] = b"1";
const AUTH_PROVIDER: &[u8] = b"Hermez Network";
const AUTH_MESSAGE: &[u8] = b"Account creation";

/// Largest `s` accepted, half the secp256k1 group order.
const MAX_S: U256 = U256::from_limbs([
    0xDFE92F46681B20A0,
    0x5D576E7357A4501D,
    0xFFFFFFFFFFFFFFFF,
    0x7FFFFFFFFFFFFFFF,
]);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("signature s value is in the upper half of the curve order")]
    HighS,

    #[error("recover signer: {0}")]
    Recover(#[from] SignatureError),
}

/// Domain separator binding authorizations to one rollup deployment.
pub fn domain_separator(chain_id: u16, rollup_address: Buf20) -> B256 {
    let rollup = Address::from(rollup_address);
    let mut buf = Vec::with_capacity(32 * 5);
    buf.extend_from_slice(keccak256(EIP712_DOMAIN_TYPE).as_slice());
    buf.extend_from_slice(keccak256(DOMAIN_NAME).as_slice());
    buf.extend_from_slice(keccak256(DOMAIN_VERSION).as_slice());
    buf.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    buf.extend_from_slice(rollup.into_word().as_slice());
    keccak256(&buf)
}

/// Digest the account owner signs to authorize `bjj`.
pub fn authorisation_digest(chain_id: u16, rollup_address: Buf20, bjj: &Buf32) -> B256 {
    let mut data = Vec::with_capacity(32 * 4);
    data.extend_from_slice(keccak256(AUTHORISE_TYPE).as_slice());
    data.extend_from_slice(keccak256(AUTH_PROVIDER).as_slice());
    data.extend_from_slice(keccak256(AUTH_MESSAGE).as_slice());
    data.extend_from_slice(bjj.as_slice());
    let struct_hash = keccak256(&data);

    let mut msg = Vec::with_capacity(2 + 32 * 2);
    msg.extend_from_slice(b"\x19\x01");
    msg.extend_from_slice(domain_separator(chain_id, rollup_address).as_slice());
    msg.extend_from_slice(struct_hash.as_slice());
    keccak256(&msg)
}

/// Recovers the address that authorized `bjj` from a relayed signature.
pub fn recover_authoriser(
    chain_id: u16,
    rollup_address: Buf20,
    bjj: &Buf32,
    v: u8,
    r: &Buf32,
    s: &Buf32,
) -> Result<Buf20, AuthError> {
    let s = s.to_u256();
    if s > MAX_S {
        return Err(AuthError::HighS);
    }

    let sig = Signature::from_rs_and_parity(r.to_u256(), s, u64::from(v))?;
    let digest = authorisation_digest(chain_id, rollup_address, bjj);
    let addr = sig.recover_address_from_prehash(&digest)?;
    Ok(Buf20::from(addr))
}
