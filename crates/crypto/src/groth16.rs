//! Batch proofs and the verifiers selected by verifier slot.

use std::fmt;

use alloy_primitives::U256;
use borsh::{BorshDeserialize, BorshSerialize};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::*;

use settle_primitives::buf::Buf32;

/// Groth16 proof points as submitted by the coordinator.
#[derive(
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Groth16Proof {
    pub a: [Buf32; 2],
    pub b: [[Buf32; 2]; 2],
    pub c: [Buf32; 2],
}

/// Checks a proof against the single public input of a batch.
#[cfg_attr(test, automock)]
pub trait ProofVerifier {
    fn verify_proof(&self, proof: &Groth16Proof, public_input: &U256) -> bool;
}

/// Accepts every proof.
///
/// Used when running natively without generating proofs, where checking the
/// public input construction is all we care about.
#[derive(Copy, Clone, Debug, Default)]
pub struct NativeVerifier;

impl ProofVerifier for NativeVerifier {
    fn verify_proof(&self, _proof: &Groth16Proof, public_input: &U256) -> bool {
        debug!(%public_input, "native verifier accepting proof");
        true
    }
}

/// Verifiers indexed by slot, one per circuit size.
#[derive(Default)]
pub struct VerifierSet {
    slots: Vec<Box<dyn ProofVerifier>>,
}

impl VerifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a verifier, returning its slot.
    pub fn push(&mut self, verifier: Box<dyn ProofVerifier>) -> usize {
        self.slots.push(verifier);
        self.slots.len() - 1
    }

    pub fn get(&self, slot: usize) -> Option<&dyn ProofVerifier> {
        self.slots.get(slot).map(|v| v.as_ref())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for VerifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierSet")
            .field("slots", &self.slots.len())
            .finish()
    }
}
