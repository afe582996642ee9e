//! Inbound message from the chat backend: delivered to the adapter for trigger
//! matching and action dispatch.

use chrono::{DateTime, Utc};

/// A message received from the chat backend. Copied into the history ring and
/// carried through a dispatched action as its parameter bag.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub text: String,
    pub channel: String,
    pub sender: String,
    pub received_at: DateTime<Utc>,
}
