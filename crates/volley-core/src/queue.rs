//! Append-only queue for cross-entity writes from parallel workers.
//!
//! The queue wraps a bounded `crossbeam_channel`. Producers push through
//! `&EventQueue` from any number of threads. Draining takes
//! `&mut EventQueue`, so the borrow checker guarantees that no producer is
//! still live when the single consumer runs.
//!
//! Push order depends on thread scheduling. Consumers that need a
//! deterministic order drain with [`EventQueue::drain_sorted_by_key`].
//!
//! # Example
//!
//! ```
//! use rayon::prelude::*;
//! use volley_core::queue::EventQueue;
//!
//! let mut queue = EventQueue::with_capacity(100);
//! (0..100_u32).into_par_iter().for_each(|i| {
//!     queue.push(i).unwrap();
//! });
//!
//! let drained = queue.drain_sorted_by_key(|v| *v);
//! assert_eq!(drained, (0..100).collect::<Vec<_>>());
//! assert!(queue.is_empty());
//! ```

use crossbeam_channel::{Receiver, Sender};

use crate::error::QueueError;

/// Fixed-capacity, append-only multi-producer queue.
#[derive(Debug)]
pub struct EventQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    capacity: usize,
}

impl<T> EventQueue<T> {
    /// Reserve `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Reserved capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pushed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether nothing has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] when every reserved slot is taken.
    pub fn push(&self, value: T) -> Result<(), QueueError> {
        // The receiver lives as long as the queue, so only `Full` is reachable.
        self.sender.try_send(value).map_err(|_| QueueError::Full {
            capacity: self.capacity,
        })
    }

    /// Take every entry in push order and reset the queue.
    pub fn drain(&mut self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Take every entry ordered by `key` and reset the queue.
    ///
    /// The sort is stable, but push order is not deterministic across
    /// threads; keys should be unique.
    pub fn drain_sorted_by_key<K: Ord>(&mut self, key: impl FnMut(&T) -> K) -> Vec<T> {
        let mut entries = self.drain();
        entries.sort_by_key(key);
        entries
    }
}
