//! Queue with monotonic absolute indexes, serializable with Borsh.
//!
//! Entries are addressed by an absolute index that keeps growing as the front
//! is popped, so an index is never handed out twice.  This does *not* use
//! `VecDeque` internally, to keep the serialized form trivial.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct StateQueue<T> {
    /// Absolute index of the front of the queue.
    base_idx: u64,

    /// The entries in the queue.
    entries: Vec<T>,
}

impl<T> StateQueue<T> {
    /// Creates a new empty queue whose first entry will get `base_idx`.
    pub fn new_at_index(base_idx: u64) -> Self {
        Self {
            base_idx,
            entries: Vec::new(),
        }
    }

    /// Absolute position of the front of the queue, even if it's empty.
    pub fn base_idx(&self) -> u64 {
        self.base_idx
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Absolute index the next pushed entry will get.
    pub fn next_idx(&self) -> u64 {
        self.base_idx + self.entries.len() as u64
    }

    /// Absolute index of the back entry, if there is one.
    pub fn back_idx(&self) -> Option<u64> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.next_idx() - 1)
        }
    }

    pub fn front(&self) -> Option<&T> {
        self.entries.first()
    }

    pub fn back(&self) -> Option<&T> {
        self.entries.last()
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.entries.last_mut()
    }

    /// Gets an entry by absolute position.
    pub fn get_absolute(&self, idx: u64) -> Option<&T> {
        if idx < self.base_idx {
            return None;
        }
        self.entries.get((idx - self.base_idx) as usize)
    }

    /// Pushes an entry to the back, returning its absolute index.
    pub fn push_back(&mut self, ent: T) -> u64 {
        let idx = self.next_idx();
        self.entries.push(ent);
        idx
    }

    /// Pops the front entry, retiring its index.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        self.base_idx += 1;
        Some(self.entries.remove(0))
    }

    /// Iterates over the entries from front to back with their absolute index.
    pub fn iter_entries(&self) -> impl Iterator<Item = (u64, &'_ T)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i as u64 + self.base_idx, e))
    }
}

#[cfg(test)]
mod tests {
    use super::StateQueue;

    #[test]
    fn test_indexes_never_reused() {
        let mut q = StateQueue::<u64>::new_at_index(0);

        assert_eq!(q.push_back(5), 0);
        assert_eq!(q.push_back(6), 1);
        assert_eq!(q.pop_front(), Some(5));
        assert_eq!(q.base_idx(), 1);

        assert_eq!(q.pop_front(), Some(6));
        assert!(q.is_empty());
        assert_eq!(q.pop_front(), None);
        assert_eq!(q.base_idx(), 2);

        // popping everything doesn't rewind the index
        assert_eq!(q.push_back(7), 2);
        assert_eq!(q.back_idx(), Some(2));
    }

    #[test]
    fn test_absolute_lookup() {
        let mut q = StateQueue::<u64>::new_at_index(10);
        q.push_back(5);
        q.push_back(6);
        q.push_back(7);

        assert_eq!(q.get_absolute(9), None);
        assert_eq!(q.get_absolute(11), Some(&6));
        assert_eq!(q.get_absolute(13), None);

        *q.back_mut().unwrap() = 8;
        let all: Vec<_> = q.iter_entries().collect();
        assert_eq!(all, vec![(10, &5), (11, &6), (12, &8)]);
    }
}
