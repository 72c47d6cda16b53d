// src/queue.rs

//! Minimal FIFO queue.
//!
//! [`Queue`] is a thin typed first-in-first-out buffer: values go in at the
//! back with [`enqueue`](Queue::enqueue) and come out at the front with
//! [`dequeue`](Queue::dequeue). Both drained-queue accessors return `None`
//! rather than failing.

use std::collections::VecDeque;

/// First-in-first-out queue of values of type `T`.
#[derive(Debug, Clone)]
pub struct Queue<T> {
    items: VecDeque<T>,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Number of queued values.
    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a value at the back of the queue.
    pub fn enqueue(&mut self, value: T) {
        self.items.push_back(value);
    }

    /// Remove and return the front value, or `None` if the queue is empty.
    pub fn dequeue(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Look at the front value without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    /// Drop all queued values.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
