//! Chat backend channels (Slack RTM).
//!
//! Transport trait and event stream so the adapter can react to connection
//! events and send replies. Inbound messages are sent to the adapter for
//! trigger matching and action dispatch.

mod inbound;
mod slack;
mod transport;

pub use inbound::InboundMessage;
pub use slack::{SlackError, SlackTransport};
pub use transport::{RemoteIdentity, Transport, TransportEvent};
