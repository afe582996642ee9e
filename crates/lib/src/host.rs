//! Host framework boundary: action dispatch and chat-room membership.
//!
//! The adapter hands matched messages to the host's dispatcher as
//! `ActionRequest`s; the host completes them asynchronously by sending an
//! `ActionCompletion` back on the adapter's completion queue.

use crate::channels::InboundMessage;
use crate::response::ActionResult;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A matched message turned into a host-dispatchable action.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    /// Correlation sequence number assigned at dispatch time.
    pub sequence: u64,
    /// Action name captured by the trigger. May be empty, in which case the
    /// host's action lookup fails as an unknown action.
    pub action: String,
    /// The originating message, passed through as the action's parameters.
    pub message: InboundMessage,
}

/// The host's asynchronous answer to one `ActionRequest`.
#[derive(Debug, Clone)]
pub struct ActionCompletion {
    pub sequence: u64,
    pub result: ActionResult,
    /// When false the response is suppressed entirely; nothing is sent.
    pub to_render: bool,
}

/// Processes action requests asynchronously. Exactly one completion per
/// request should be delivered on `completions`; the adapter logs duplicates
/// as stale and drops them.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(&self, request: ActionRequest, completions: mpsc::Sender<ActionCompletion>);
}

/// Host chat-room membership, used to join the republish room on connect.
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    async fn add_member(&self, connection_id: &str, room: &str) -> Result<(), String>;
}
