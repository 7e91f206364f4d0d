use std::collections::VecDeque;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is full (capacity {0})")]
    Full(usize),
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// Bounded FIFO of pending task ids.
///
/// Holds ids only; the task store owns the records. A task's position is its
/// 1-based index here and is never stored on the record.
#[derive(Debug)]
pub struct PendingQueue {
    ids: VecDeque<String>,
    capacity: usize,
}

impl PendingQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ids.len() >= self.capacity
    }

    /// Append an id and return its 1-based position
    pub fn push(&mut self, id: String) -> Result<usize> {
        if self.is_full() {
            return Err(QueueError::Full(self.capacity));
        }
        self.ids.push_back(id);
        Ok(self.ids.len())
    }

    pub fn pop_front(&mut self) -> Option<String> {
        self.ids.pop_front()
    }

    /// 1-based position of `id`, if queued
    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|queued| queued == id).map(|idx| idx + 1)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        match self.ids.iter().position(|queued| queued == id) {
            Some(idx) => self.ids.remove(idx).is_some(),
            None => false,
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }
}
