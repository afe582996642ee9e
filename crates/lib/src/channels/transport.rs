//! Transport boundary to the chat backend: connection events in, sends out.

use crate::channels::inbound::InboundMessage;
use async_trait::async_trait;

/// Identity metadata reported by the backend after a successful handshake.
#[derive(Debug, Clone)]
pub struct RemoteIdentity {
    pub user: String,
    pub team: String,
}

/// Connection-level events delivered by a transport's inbound task.
#[derive(Debug)]
pub enum TransportEvent {
    /// Handshake succeeded; carries the bot identity the backend reported.
    Authenticated(RemoteIdentity),
    /// The realtime connection is open; messages follow.
    Opened,
    /// A chat message arrived.
    Message(InboundMessage),
    /// The connection closed cleanly (stop or remote close).
    Closed,
    /// The connection failed. Unrecoverable for this connection.
    Failed(String),
}

/// Handle to a live transport connection (send messages, stop).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport id (e.g. "slack").
    fn id(&self) -> &str;
    /// Stop the transport connection.
    fn stop(&self);
    /// Send a text message to a channel. Default returns error.
    async fn send_message(&self, _channel: &str, _text: &str) -> Result<(), String> {
        Err("send not implemented".to_string())
    }
}
