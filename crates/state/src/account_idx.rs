//! Account index bookkeeping.
//!
//! The rollup never assigns indexes itself, the off-chain state builder does.
//! We only track the highest index committed by a batch so L1 requests can
//! be checked against existing accounts.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use settle_primitives::constants::{MAX_ACCOUNT_IDX, RESERVED_IDX};

use crate::errors::StateError;

#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct AccountIndexAllocator {
    last_idx: u64,
}

impl Default for AccountIndexAllocator {
    fn default() -> Self {
        Self {
            last_idx: RESERVED_IDX,
        }
    }
}

impl AccountIndexAllocator {
    pub fn last_idx(&self) -> u64 {
        self.last_idx
    }

    /// Checks if `idx` refers to an account that was already created.
    pub fn is_assigned(&self, idx: u64) -> bool {
        idx > RESERVED_IDX && idx <= self.last_idx
    }

    /// Checks a batch's new last index without applying it.
    pub fn check_advance(&self, new_last_idx: u64) -> Result<(), StateError> {
        if new_last_idx > MAX_ACCOUNT_IDX {
            return Err(StateError::IdxOutOfRange(new_last_idx));
        }
        if new_last_idx < self.last_idx {
            return Err(StateError::NonMonotonicIdx {
                cur: self.last_idx,
                new: new_last_idx,
            });
        }
        Ok(())
    }

    pub fn advance_to(&mut self, new_last_idx: u64) -> Result<(), StateError> {
        self.check_advance(new_last_idx)?;
        self.last_idx = new_last_idx;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance() {
        let mut alloc = AccountIndexAllocator::default();
        assert_eq!(alloc.last_idx(), 255);
        assert!(!alloc.is_assigned(255));
        assert!(!alloc.is_assigned(256));

        alloc.advance_to(300).unwrap();
        assert!(alloc.is_assigned(256));
        assert!(alloc.is_assigned(300));
        assert!(!alloc.is_assigned(301));

        // same index is fine, a batch may create no accounts
        alloc.advance_to(300).unwrap();
        assert_eq!(
            alloc.advance_to(299),
            Err(StateError::NonMonotonicIdx { cur: 300, new: 299 })
        );
        assert_eq!(
            alloc.advance_to(1 << 48),
            Err(StateError::IdxOutOfRange(1 << 48))
        );
    }
}
