//! Exit leaves that were already withdrawn.
//!
//! Single leaf withdrawals claim a leaf of one batch at most once.  Multi
//! token withdrawals work against cumulative exit balances instead, tracking
//! how much of each account's exit was already paid out.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::U256;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use settle_primitives::buf::Buf32;

use crate::errors::StateError;

#[derive(
    Clone, Debug, Default, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ExitNullifiers {
    claimed: BTreeSet<(u64, u64)>,
}

impl ExitNullifiers {
    pub fn is_claimed(&self, batch_num: u64, idx: u64) -> bool {
        self.claimed.contains(&(batch_num, idx))
    }

    pub fn claim(&mut self, batch_num: u64, idx: u64) -> Result<(), StateError> {
        if !self.claimed.insert((batch_num, idx)) {
            return Err(StateError::ExitAlreadyClaimed { batch_num, idx });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

/// Amount already withdrawn per account index.
#[derive(
    Clone, Debug, Default, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ExitAccumulator {
    withdrawn: BTreeMap<u64, Buf32>,
}

impl ExitAccumulator {
    pub fn withdrawn(&self, idx: u64) -> U256 {
        self.withdrawn
            .get(&idx)
            .map(Buf32::to_u256)
            .unwrap_or_default()
    }

    /// Checks that `amount` more can be withdrawn from an exit totalling
    /// `total`, returning the new withdrawn amount.
    pub fn check_add(&self, idx: u64, amount: U256, total: U256) -> Result<U256, StateError> {
        let withdrawn = self.withdrawn(idx);
        match withdrawn.checked_add(amount) {
            Some(new) if new <= total => Ok(new),
            _ => Err(StateError::ExitOverdrawn { idx, withdrawn, amount, total }),
        }
    }

    pub fn add(&mut self, idx: u64, amount: U256, total: U256) -> Result<(), StateError> {
        let new = self.check_add(idx, amount, total)?;
        self.withdrawn.insert(idx, Buf32::from(new));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_once_per_batch() {
        let mut n = ExitNullifiers::default();
        n.claim(3, 256).unwrap();
        assert!(n.is_claimed(3, 256));
        assert!(!n.is_claimed(4, 256));
        assert_eq!(
            n.claim(3, 256),
            Err(StateError::ExitAlreadyClaimed {
                batch_num: 3,
                idx: 256
            })
        );
        n.claim(4, 256).unwrap();
        assert_eq!(n.len(), 2);
    }

    #[test]
    fn test_accumulator_caps_at_total() {
        let mut acc = ExitAccumulator::default();
        let total = U256::from(10u8);
        acc.add(256, U256::from(5u8), total).unwrap();
        assert_eq!(acc.withdrawn(256), U256::from(5u8));
        assert_eq!(acc.withdrawn(257), U256::ZERO);

        assert!(matches!(
            acc.add(256, U256::from(6u8), total),
            Err(StateError::ExitOverdrawn { idx: 256, .. })
        ));
        assert_eq!(acc.withdrawn(256), U256::from(5u8));

        acc.add(256, U256::from(5u8), total).unwrap();
        assert!(acc.check_add(256, U256::from(1u8), total).is_err());
    }
}
