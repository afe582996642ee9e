//! Pending-request correlation: sequence number -> originating channel.
//!
//! One tracker per logical connection, owned by the adapter run loop. All
//! mutation happens on that one task, so no locking is needed here.

use std::collections::HashMap;

/// Tracks in-flight action requests for one connection.
#[derive(Debug, Default)]
pub struct PendingRequests {
    next_sequence: u64,
    in_flight: HashMap<u64, String>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next sequence number and remember the originating channel.
    /// Sequence numbers start at 1, increase strictly, and are never reused
    /// while an entry for them is live.
    pub fn allocate(&mut self, channel: impl Into<String>) -> u64 {
        self.next_sequence += 1;
        self.in_flight.insert(self.next_sequence, channel.into());
        self.next_sequence
    }

    /// Return and remove the channel stored for `sequence`. `None` means the
    /// sequence was never allocated or was already resolved — a duplicate
    /// delivery upstream, which callers should log loudly rather than ignore.
    pub fn resolve(&mut self, sequence: u64) -> Option<String> {
        self.in_flight.remove(&sequence)
    }

    /// Number of in-flight entries.
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}
