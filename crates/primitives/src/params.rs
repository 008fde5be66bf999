//! Global parameters for the settlement core.

use serde::{Deserialize, Serialize};

use crate::{buf::Buf20, constants::MAX_FEE_IDX_COORDINATOR};

/// Minimum number of live queue slots, the to-forge and filling slots.
pub const MIN_PENDING_L1_QUEUES: u64 = 2;

/// Parameters that don't change for the lifetime of a deployment.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RollupParams {
    /// Chain id mixed into the public input and the authorization domain.
    pub chain_id: u16,

    /// Address the coordinator authorizations are bound to.
    pub rollup_address: Buf20,

    /// Only caller allowed to run governance operations.
    pub governance: Buf20,

    /// Token the listing fee is paid in.
    pub fee_token: Buf20,

    /// Circuit sizes, indexed by verifier slot.
    pub verifiers: Vec<VerifierParams>,
}

impl RollupParams {
    pub fn verifier(&self, slot: usize) -> Option<&VerifierParams> {
        self.verifiers.get(slot)
    }
}

/// Shape of the circuit a verifier slot accepts.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VerifierParams {
    /// Maximum number of transactions in a batch.
    pub max_tx: u64,

    /// Depth of the state tree.
    pub n_levels: u64,
}

impl VerifierParams {
    /// Bytes used by an account index in the L2 tx data.
    pub fn idx_bytes(&self) -> usize {
        (self.n_levels / 8) as usize
    }

    /// Padded size of the L1/L2 data section.
    ///
    /// Each tx is `fromIdx ‖ toIdx ‖ amountF:2 ‖ fee:1`.
    pub fn l1l2_data_len(&self) -> usize {
        (self.idx_bytes() * 2 + 2 + 1) * self.max_tx as usize
    }

    /// Padded size of the fee index section.
    pub fn fee_idx_len(&self) -> usize {
        self.idx_bytes() * MAX_FEE_IDX_COORDINATOR
    }
}
