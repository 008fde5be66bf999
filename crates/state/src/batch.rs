//! Record of forged batches.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use settle_primitives::buf::Buf32;

use crate::errors::StateError;

/// What a successful forge commits to.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch_num: u64,
    pub state_root: Buf32,
    pub exit_root: Buf32,

    /// SHA-256 of the padded L1/L2 data section.
    pub l1l2_data_hash: Buf32,

    /// Block the batch was forged at.
    pub block: u64,

    pub is_l1_batch: bool,

    /// Number of user L1 txs consumed from the queue.
    pub l1_user_tx_count: u32,
}

impl BatchRecord {
    fn genesis() -> Self {
        Self {
            batch_num: 0,
            state_root: Buf32::zero(),
            exit_root: Buf32::zero(),
            l1l2_data_hash: Buf32::zero(),
            block: 0,
            is_l1_batch: false,
            l1_user_tx_count: 0,
        }
    }
}

/// Append-only chain of batches keyed by batch number, batch 0 being genesis.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BatchChain {
    batches: Vec<BatchRecord>,
}

impl Default for BatchChain {
    fn default() -> Self {
        Self {
            batches: vec![BatchRecord::genesis()],
        }
    }
}

impl BatchChain {
    pub fn last_batch_num(&self) -> u64 {
        self.batches.len() as u64 - 1
    }

    pub fn next_batch_num(&self) -> u64 {
        self.batches.len() as u64
    }

    pub fn get(&self, batch_num: u64) -> Option<&BatchRecord> {
        self.batches.get(batch_num as usize)
    }

    pub fn tip(&self) -> &BatchRecord {
        // never empty, genesis is there from construction
        &self.batches[self.batches.len() - 1]
    }

    pub fn state_root(&self) -> Buf32 {
        self.tip().state_root
    }

    pub fn exit_root(&self, batch_num: u64) -> Option<Buf32> {
        self.get(batch_num).map(|b| b.exit_root)
    }

    pub fn append(&mut self, record: BatchRecord) -> Result<(), StateError> {
        if record.batch_num != self.next_batch_num() {
            return Err(StateError::BatchOutOfOrder {
                expected: self.next_batch_num(),
                got: record.batch_num,
            });
        }
        self.batches.push(record);
        Ok(())
    }
}
