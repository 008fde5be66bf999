use std::cell::Cell;

use arbitrary::{Arbitrary, Unstructured};
use rand::{rngs::StdRng, RngCore, SeedableRng};

pub mod l1;
pub mod state;
pub mod stubs;

/// Entropy for a few thousand L1 records.
const DEFAULT_ENTROPY: usize = 1 << 16;

/// Seeded source of arbitrary values, so a failing case can be replayed.
pub struct ArbitraryGenerator {
    entropy: Vec<u8>,
    consumed: Cell<usize>,
}

impl ArbitraryGenerator {
    pub fn from_seed(seed: u64) -> Self {
        Self::with_entropy(seed, DEFAULT_ENTROPY)
    }

    pub fn with_entropy(seed: u64, len: usize) -> Self {
        let mut entropy = vec![0; len];
        StdRng::seed_from_u64(seed).fill_bytes(&mut entropy);
        Self {
            entropy,
            consumed: Cell::new(0),
        }
    }

    /// Bytes left before values start coming out as defaults.
    pub fn remaining(&self) -> usize {
        self.entropy.len() - self.consumed.get()
    }

    pub fn generate<'a, T: Arbitrary<'a>>(&'a self) -> T {
        let mut u = Unstructured::new(&self.entropy[self.consumed.get()..]);
        let value = T::arbitrary(&mut u).expect("arbitrary value from entropy");
        self.consumed.set(self.entropy.len() - u.len());
        value
    }
}
