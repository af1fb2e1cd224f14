use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of entries any outcome history keeps.
pub const HISTORY_CAPACITY: usize = 50;

/// Append-only outcome history with FIFO eviction past a fixed capacity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> Default for OutcomeLog<T> {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl<T> OutcomeLog<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends `entry`, returning the evicted oldest entry when full.
    pub fn push(&mut self, entry: T) -> Option<T> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    /// The most recent `n` entries, oldest first.
    pub fn trailing(&self, n: usize) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.range(skip..)
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }
}

impl<T: Copy> OutcomeLog<T> {
    pub fn trailing_values(&self, n: usize) -> Vec<T> {
        self.trailing(n).copied().collect()
    }
}
