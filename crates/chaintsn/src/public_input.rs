//! Construction of the single public input a batch proof is checked against.

use alloy_primitives::U256;
use sha2::{Digest, Sha256};

use settle_primitives::{
    buf::{Buf20, Buf32},
    constants::{L1_USER_TOTALBYTES, MAX_L1_TX, RFIELD},
};

use crate::errors::ForgeError;

/// Everything the public input commits to, sections already padded.
#[derive(Clone, Debug)]
pub struct CircuitInput<'a> {
    pub old_last_idx: u64,
    pub new_last_idx: u64,
    pub old_state_root: Buf32,
    pub new_state_root: Buf32,
    pub new_exit_root: Buf32,
    pub l1_data: &'a [u8],
    pub l1l2_data: &'a [u8],
    pub fee_idx_data: &'a [u8],
    pub chain_id: u16,
    pub batch_num: u64,
}

/// Hashes the input blob and reduces it into the scalar field.
///
/// `oldLastIdx:6 ‖ newLastIdx:6 ‖ oldStateRoot ‖ newStateRoot ‖ newExitRoot ‖
/// L1 ‖ L1L2 ‖ fee ‖ chainId:2 ‖ batchNum:4`
pub fn construct_circuit_input(input: &CircuitInput<'_>) -> U256 {
    let mut hasher = Sha256::new();
    hasher.update(&input.old_last_idx.to_be_bytes()[2..]);
    hasher.update(&input.new_last_idx.to_be_bytes()[2..]);
    hasher.update(input.old_state_root.as_slice());
    hasher.update(input.new_state_root.as_slice());
    hasher.update(input.new_exit_root.as_slice());
    hasher.update(input.l1_data);
    hasher.update(input.l1l2_data);
    hasher.update(input.fee_idx_data);
    hasher.update(input.chain_id.to_be_bytes());
    hasher.update(&input.batch_num.to_be_bytes()[4..]);

    let digest: [u8; 32] = hasher.finalize().into();
    U256::from_be_bytes(digest) % RFIELD
}

/// One exit leaf a withdrawal proof vouches for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WithdrawnLeaf {
    pub token_id: u32,
    pub amount: U256,
    pub idx: u64,
}

/// Public input of a withdrawal proof over one or more leaves of the same
/// owner.
///
/// `exitRoot ‖ owner:20 ‖ (tokenId:4 ‖ amount:24 ‖ idx:6)*`.  Amounts must fit
/// 192 bits.
pub fn construct_withdraw_input(exit_root: Buf32, owner: Buf20, leaves: &[WithdrawnLeaf]) -> U256 {
    let mut hasher = Sha256::new();
    hasher.update(exit_root.as_slice());
    hasher.update(owner.as_slice());
    for leaf in leaves {
        hasher.update(leaf.token_id.to_be_bytes());
        hasher.update(&leaf.amount.to_be_bytes::<32>()[8..]);
        hasher.update(&leaf.idx.to_be_bytes()[2..]);
    }

    let digest: [u8; 32] = hasher.finalize().into();
    U256::from_be_bytes(digest) % RFIELD
}

/// Builds the L1 section from the queued user txs and the expanded
/// coordinator txs, zero padded to the full batch capacity.
pub fn build_l1_section(user_txs: &[u8], coordinator_txs: &[u8]) -> Result<Vec<u8>, ForgeError> {
    let count = (user_txs.len() + coordinator_txs.len()) / L1_USER_TOTALBYTES;
    if count > MAX_L1_TX {
        return Err(ForgeError::L1TxOverflow(count));
    }

    let mut out = Vec::with_capacity(MAX_L1_TX * L1_USER_TOTALBYTES);
    out.extend_from_slice(user_txs);
    out.extend_from_slice(coordinator_txs);
    out.resize(MAX_L1_TX * L1_USER_TOTALBYTES, 0);
    Ok(out)
}

/// Zero pads `data` to `len`, `None` if it's already longer.
pub fn pad_section(data: &[u8], len: usize) -> Option<Vec<u8>> {
    if data.len() > len {
        return None;
    }
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(data);
    out.resize(len, 0);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample<'a>(l1: &'a [u8], l1l2: &'a [u8], fee: &'a [u8]) -> CircuitInput<'a> {
        CircuitInput {
            old_last_idx: 255,
            new_last_idx: 256,
            old_state_root: Buf32::zero(),
            new_state_root: Buf32::from([1; 32]),
            new_exit_root: Buf32::from([2; 32]),
            l1_data: l1,
            l1l2_data: l1l2,
            fee_idx_data: fee,
            chain_id: 1337,
            batch_num: 1,
        }
    }

    #[test]
    fn test_input_matches_manual_blob() {
        let l1 = build_l1_section(&[3; 72], &[]).unwrap();
        let l1l2 = pad_section(&[4; 5], 11).unwrap();
        let fee = pad_section(&[], 256).unwrap();
        let input = sample(&l1, &l1l2, &fee);

        let mut blob = Vec::new();
        blob.extend_from_slice(&[0, 0, 0, 0, 0, 255]);
        blob.extend_from_slice(&[0, 0, 0, 0, 1, 0]);
        blob.extend_from_slice(&[0; 32]);
        blob.extend_from_slice(&[1; 32]);
        blob.extend_from_slice(&[2; 32]);
        blob.extend_from_slice(&l1);
        blob.extend_from_slice(&l1l2);
        blob.extend_from_slice(&fee);
        blob.extend_from_slice(&1337u16.to_be_bytes());
        blob.extend_from_slice(&[0, 0, 0, 1]);

        let digest: [u8; 32] = Sha256::digest(&blob).into();
        let expected = U256::from_be_bytes(digest) % RFIELD;
        assert_eq!(construct_circuit_input(&input), expected);
        assert!(expected < RFIELD);
    }

    #[test]
    fn test_input_binds_every_field() {
        let l1 = build_l1_section(&[], &[]).unwrap();
        let base = sample(&l1, &[], &[]);
        let reference = construct_circuit_input(&base);

        let mut changed = base.clone();
        changed.batch_num = 2;
        assert_ne!(construct_circuit_input(&changed), reference);

        let mut changed = base.clone();
        changed.chain_id = 1;
        assert_ne!(construct_circuit_input(&changed), reference);

        let mut changed = base;
        changed.new_exit_root = Buf32::zero();
        assert_ne!(construct_circuit_input(&changed), reference);
    }

    #[test]
    fn test_l1_section_limits() {
        let full = vec![1u8; MAX_L1_TX * L1_USER_TOTALBYTES];
        let l1 = build_l1_section(&full[..128 * 72], &full[128 * 72..]).unwrap();
        assert_eq!(l1, full);

        let res = build_l1_section(&full, &[0; 72]);
        assert!(matches!(res, Err(ForgeError::L1TxOverflow(257))));
    }

    #[test]
    fn test_withdraw_input_layout() {
        let owner = Buf20::from([0xaa; 20]);
        let leaf = WithdrawnLeaf {
            token_id: 3,
            amount: U256::from(0x0102u64),
            idx: 256,
        };

        let mut blob = vec![9u8; 32];
        blob.extend_from_slice(&[0xaa; 20]);
        blob.extend_from_slice(&[0, 0, 0, 3]);
        let mut amount = [0u8; 24];
        amount[22..].copy_from_slice(&[1, 2]);
        blob.extend_from_slice(&amount);
        blob.extend_from_slice(&[0, 0, 0, 0, 1, 0]);

        let digest: [u8; 32] = Sha256::digest(&blob).into();
        let expected = U256::from_be_bytes(digest) % RFIELD;
        let root = Buf32::from([9; 32]);
        assert_eq!(construct_withdraw_input(root, owner, &[leaf]), expected);

        // every leaf is bound, in order
        let other = WithdrawnLeaf { idx: 257, ..leaf };
        assert_ne!(
            construct_withdraw_input(root, owner, &[leaf, other]),
            construct_withdraw_input(root, owner, &[other, leaf])
        );
    }

    #[test]
    fn test_pad_section() {
        assert_eq!(pad_section(&[1, 2], 4), Some(vec![1, 2, 0, 0]));
        assert_eq!(pad_section(&[1, 2, 3], 2), None);
    }
}
