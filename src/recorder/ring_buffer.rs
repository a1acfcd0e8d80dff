//! Fixed-capacity sample history.

use serde::{Deserialize, Serialize};

/// One recorded value with the frame and session time it was taken at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample<T> {
    pub frame: u64,
    pub elapsed_time: f32,
    pub value: T,
}

/// A circular buffer that overwrites its oldest entry once full.
///
/// Storage is allocated once at construction. Logical index `0` is always the
/// oldest retained entry and `len() - 1` the newest.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    cursor: usize,
    count: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Creates an empty buffer. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![T::default(); capacity.max(1)],
            cursor: 0,
            count: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        self.slots[self.cursor] = item;
        self.cursor = (self.cursor + 1) % self.slots.len();
        if self.count < self.slots.len() {
            self.count += 1;
        }
    }

    /// Gets an item by logical index (0 = oldest, len-1 = newest).
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.count {
            return None;
        }
        let physical = if self.count < self.slots.len() {
            index
        } else {
            // cursor is the next slot to be overwritten, i.e. the oldest entry
            (self.cursor + index) % self.slots.len()
        };
        Some(&self.slots[physical])
    }

    pub fn last(&self) -> Option<&T> {
        self.count.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.count).filter_map(move |i| self.get(i))
    }

    /// Forgets all entries; storage is kept.
    pub fn clear(&mut self) {
        self.cursor = 0;
        self.count = 0;
    }
}
