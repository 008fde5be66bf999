//! Intake buffer for L1 user transactions.
//!
//! Requests land in the "filling" slot.  The oldest live slot is the
//! "to-forge" slot, consumed whole by the next L1 batch.  Slots live in a
//! [`StateQueue`] whose base index is always the to-forge slot and whose back
//! is always the filling slot, so the to-forge index stays strictly below the
//! filling index and retired indexes are never reused.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::*;

use settle_primitives::{
    constants::{L1_USER_TOTALBYTES, MAX_L1_USER_TX},
    errors::ParseError,
    l1tx::{decode_l1_txs, L1Tx},
    params::MIN_PENDING_L1_QUEUES,
};

use crate::{errors::QueueError, state_queue::StateQueue};

/// One queue slot, the raw concatenation of its encoded requests.
#[derive(
    Clone, Debug, Default, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct QueueSlot {
    data: Vec<u8>,
}

impl QueueSlot {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn tx_count(&self) -> usize {
        self.data.len() / L1_USER_TOTALBYTES
    }

    pub fn is_full(&self) -> bool {
        self.tx_count() >= MAX_L1_USER_TX
    }

    pub fn txs(&self) -> Result<Vec<L1Tx>, ParseError> {
        decode_l1_txs(&self.data)
    }
}

/// Where an enqueued request ended up.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct QueuePosition {
    pub queue_idx: u64,
    pub position: u32,
}

#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct L1TxQueue {
    slots: StateQueue<QueueSlot>,

    /// Bound on the live slots, to-forge through filling inclusive.
    max_live_slots: u64,
}

impl L1TxQueue {
    /// Creates the queue with the to-forge slot at 0 and the filling slot at 1.
    pub fn new(max_live_slots: u64) -> Self {
        let mut slots = StateQueue::new_at_index(0);
        slots.push_back(QueueSlot::default());
        slots.push_back(QueueSlot::default());
        Self {
            slots,
            max_live_slots: max_live_slots.max(MIN_PENDING_L1_QUEUES),
        }
    }

    pub fn to_forge_idx(&self) -> u64 {
        self.slots.base_idx()
    }

    pub fn filling_idx(&self) -> u64 {
        self.slots.next_idx() - 1
    }

    pub fn live_slots(&self) -> u64 {
        self.slots.len() as u64
    }

    pub fn max_live_slots(&self) -> u64 {
        self.max_live_slots
    }

    pub fn slot(&self, idx: u64) -> Option<&QueueSlot> {
        self.slots.get_absolute(idx)
    }

    /// Total user requests waiting across all live slots.
    pub fn pending_txs(&self) -> usize {
        self.slots.iter_entries().map(|(_, s)| s.tx_count()).sum()
    }

    /// Raw bytes of the slot the next L1 batch will consume.
    pub fn peek_to_forge(&self) -> &[u8] {
        self.slots.front().map(QueueSlot::data).unwrap_or_default()
    }

    /// Where the next request would land, without queueing anything.
    pub fn check_enqueue(&self) -> Result<QueuePosition, QueueError> {
        match self.slots.back() {
            Some(slot) if !slot.is_full() => Ok(QueuePosition {
                queue_idx: self.filling_idx(),
                position: slot.tx_count() as u32,
            }),
            _ if self.live_slots() >= self.max_live_slots => {
                Err(QueueError::QueueFull(self.live_slots()))
            }
            _ => Ok(QueuePosition {
                queue_idx: self.slots.next_idx(),
                position: 0,
            }),
        }
    }

    /// Appends a request to the filling slot.
    ///
    /// A full filling slot is retired first, opening a new empty one, unless
    /// that would exceed the live slot bound.
    pub fn enqueue(&mut self, tx: &L1Tx) -> Result<QueuePosition, QueueError> {
        let encoded = tx.encode()?;
        let pos = self.check_enqueue()?;

        if pos.queue_idx != self.filling_idx() {
            let idx = self.slots.push_back(QueueSlot::default());
            debug!(%idx, "opened new filling L1 queue slot");
        }

        // the slot was just ensured to exist above
        let slot = self
            .slots
            .back_mut()
            .ok_or(QueueError::QueueFull(self.max_live_slots))?;
        slot.data.extend_from_slice(&encoded);

        trace!(queue_idx = pos.queue_idx, position = pos.position, "enqueued L1 tx");
        Ok(pos)
    }

    /// Retires the to-forge slot and returns its bytes.
    ///
    /// If the filling slot becomes the to-forge slot, a fresh filling slot is
    /// opened behind it.
    pub fn rotate(&mut self) -> Vec<u8> {
        let consumed = self.slots.pop_front().unwrap_or_default();
        if self.slots.len() < 2 {
            self.slots.push_back(QueueSlot::default());
        }
        debug!(
            to_forge = self.to_forge_idx(),
            filling = self.filling_idx(),
            consumed_txs = consumed.tx_count(),
            "rotated L1 queue"
        );
        consumed.data
    }
}
