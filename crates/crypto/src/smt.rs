//! Sparse merkle tree inclusion checks against a batch's exit root.
//!
//! The tree follows the iden3 layout.  A leaf is the final node
//! `H(key, value, 1)`, inner nodes are `H(left, right)` and the path goes by
//! the bits of the key, least significant bit at the root.  The sibling list
//! is ordered root first, deepest last.

use alloy_primitives::{Address, U256};
use digest::Digest;
use sha2::Sha256;

use settle_primitives::constants::RFIELD;

/// Hash function over field elements used to build the exit tree.
pub trait NodeHasher {
    /// Hashes an ordered list of field elements into one.
    fn hash_elems(&self, elems: &[U256]) -> U256;

    fn hash_node(&self, left: U256, right: U256) -> U256 {
        self.hash_elems(&[left, right])
    }

    fn hash_final_node(&self, key: U256, value: U256) -> U256 {
        self.hash_elems(&[key, value, U256::from(1u8)])
    }
}

/// SHA-256 over the 32 byte big endian words, reduced into the scalar field.
///
/// The arity is part of the preimage length, so final nodes and inner nodes
/// never collide.
#[derive(Copy, Clone, Debug, Default)]
pub struct Sha256NodeHasher;

impl NodeHasher for Sha256NodeHasher {
    fn hash_elems(&self, elems: &[U256]) -> U256 {
        let mut hasher = Sha256::new();
        for e in elems {
            hasher.update(e.to_be_bytes::<32>());
        }
        let digest: [u8; 32] = hasher.finalize().into();
        U256::from_be_bytes(digest) % RFIELD
    }
}

/// Balance left in the exit tree for one account after a batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExitLeaf {
    pub token_id: u32,
    pub balance: U256,
    pub bjj_compressed: U256,
    pub eth_addr: Address,
}

impl ExitLeaf {
    /// Packs the account state the way the state tree stores it.
    ///
    /// `[tokenID | nonce << 32 | sign << 72, balance, ay, ethAddr]`, the nonce
    /// of an exit leaf always being zero.
    pub fn state_elems(&self) -> [U256; 4] {
        let sign = self.bjj_compressed >> 255;
        let ay = (self.bjj_compressed << 2) >> 2;
        [
            U256::from(self.token_id) | (sign << 72),
            self.balance,
            ay,
            U256::from_be_slice(self.eth_addr.as_slice()),
        ]
    }

    pub fn hash<H: NodeHasher>(&self, hasher: &H) -> U256 {
        hasher.hash_elems(&self.state_elems())
    }
}

/// Checks exit tree inclusion proofs with a particular node hasher.
#[derive(Clone, Debug, Default)]
pub struct ExitTreeVerifier<H> {
    hasher: H,
}

impl<H: NodeHasher> ExitTreeVerifier<H> {
    pub fn new(hasher: H) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Folds the siblings from the leaf up to the root.
    pub fn compute_root(&self, siblings: &[U256], key: u64, value: U256) -> U256 {
        let mut cur = self.hasher.hash_final_node(U256::from(key), value);
        for (i, sibling) in siblings.iter().enumerate().rev() {
            cur = if key_bit(key, i) {
                self.hasher.hash_node(*sibling, cur)
            } else {
                self.hasher.hash_node(cur, *sibling)
            };
        }
        cur
    }

    pub fn verify(&self, root: U256, siblings: &[U256], key: u64, value: U256) -> bool {
        self.compute_root(siblings, key, value) == root
    }
}

fn key_bit(key: u64, i: usize) -> bool {
    i < 64 && (key >> i) & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(hasher: &Sha256NodeHasher, key: u64, value: u64) -> U256 {
        hasher.hash_final_node(U256::from(key), U256::from(value))
    }

    #[test]
    fn test_single_leaf_tree() {
        let v = ExitTreeVerifier::new(Sha256NodeHasher);
        let root = leaf(v.hasher(), 300, 42);
        assert!(v.verify(root, &[], 300, U256::from(42u8)));
        assert!(!v.verify(root, &[], 301, U256::from(42u8)));
    }

    #[test]
    fn test_three_leaf_tree() {
        let h = Sha256NodeHasher;
        let v = ExitTreeVerifier::new(h);

        // keys 0 and 2 share bit 0, key 1 sits alone on the right
        let f0 = leaf(&h, 0, 10);
        let f1 = leaf(&h, 1, 11);
        let f2 = leaf(&h, 2, 12);
        let left = h.hash_node(f0, f2);
        let root = h.hash_node(left, f1);

        assert!(v.verify(root, &[f1, f0], 2, U256::from(12u8)));
        assert!(v.verify(root, &[f1, f2], 0, U256::from(10u8)));
        assert!(v.verify(root, &[left], 1, U256::from(11u8)));

        // wrong value, wrong sibling order, wrong key
        assert!(!v.verify(root, &[f1, f0], 2, U256::from(13u8)));
        assert!(!v.verify(root, &[f0, f1], 2, U256::from(12u8)));
        assert!(!v.verify(root, &[f1, f0], 0, U256::from(12u8)));
    }

    #[test]
    fn test_hash_is_field_element() {
        let h = Sha256NodeHasher;
        for i in 0..32u64 {
            assert!(h.hash_node(U256::from(i), U256::MAX) < RFIELD);
        }
        assert_ne!(
            h.hash_node(U256::from(1u8), U256::from(2u8)),
            h.hash_final_node(U256::from(1u8), U256::from(2u8))
        );
    }

    #[test]
    fn test_exit_leaf_packing() {
        let bjj = (U256::from(1u8) << 255) | U256::from(0xabcdu64);
        let leaf = ExitLeaf {
            token_id: 3,
            balance: U256::from(1000u64),
            bjj_compressed: bjj,
            eth_addr: Address::repeat_byte(0x01),
        };
        let elems = leaf.state_elems();
        assert_eq!(elems[0], U256::from(3u8) | (U256::from(1u8) << 72));
        assert_eq!(elems[2], U256::from(0xabcdu64));
        assert_eq!(elems[3] >> 152, U256::from(1u8));
    }
}
