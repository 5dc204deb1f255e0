use common::position::Position;
use serde::{Serialize, Serializer};
use std::collections::VecDeque;

/// Fixed capacity ordered sequence that evicts the oldest entries on overflow.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer<T> {
    values: VecDeque<T>,
    capacity: usize,
}

/// The bounded GPS trace of the vehicle.
pub type PathBuffer = HistoryBuffer<Position>;

impl<T> HistoryBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        HistoryBuffer {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `value`, then evicts from the front exactly the overflow amount.
    pub fn push(&mut self, value: T) {
        self.values.push_back(value);
        let overflow = self.values.len().saturating_sub(self.capacity);
        self.values.drain(..overflow);
    }

    /// Replaces the content with the last `capacity` items of `values`, in order.
    pub fn replace<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.values.clear();
        for value in values {
            self.push(value);
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.values.get(index)
    }

    pub fn last(&self) -> Option<&T> {
        self.values.back()
    }

    /// Iterates from the oldest to the newest entry.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }
}

impl<T: Clone> HistoryBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.values.iter().cloned().collect()
    }
}

impl<T: Serialize> Serialize for HistoryBuffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.values.iter())
    }
}
