//! Bounded history of recently received messages.
//!
//! Pure bookkeeping for observability: the newest `capacity` messages are
//! kept, oldest dropped first. Capacity is fixed at construction.

use crate::channels::InboundMessage;
use std::collections::VecDeque;

pub struct MessageHistory {
    capacity: usize,
    messages: VecDeque<InboundMessage>,
}

impl MessageHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::new(),
        }
    }

    /// Append to the tail, then evict from the head while over capacity.
    pub fn record(&mut self, message: InboundMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in arrival order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &InboundMessage> {
        self.messages.iter()
    }
}
