//! Adapter shell: one live transport connection, reacting to transport and
//! host events on a single queue.
//!
//! Control flow: transport message -> history ring -> trigger match -> allocate
//! a sequence number -> dispatch to the host. On completion: resolve the
//! originating channel, format the result, send it back over the transport.

use crate::channels::{InboundMessage, RemoteIdentity, Transport, TransportEvent};
use crate::history::MessageHistory;
use crate::host::{ActionCompletion, ActionDispatcher, ActionRequest, RoomRegistry};
use crate::pending::PendingRequests;
use crate::response::format_response;
use crate::triggers::TriggerSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Queue depth for host completions waiting on the adapter loop.
const COMPLETION_QUEUE_DEPTH: usize = 64;

/// Adapter-fatal errors. Send failures are logged, not returned.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Connection-level failure (socket error, failed startup handshake).
    #[error("transport failed: {0}")]
    Transport(String),
    /// File and attachment transfer is not implemented.
    #[error("sending files is not supported")]
    FilesNotSupported,
}

/// Settings the adapter needs from config.
pub struct AdapterOptions {
    pub triggers: TriggerSet,
    pub messages_to_save: usize,
    pub republish_room: Option<String>,
}

/// One logical connection to the chat backend. All mutable state (tracker,
/// history, identity) is owned by the run loop; collaborators are reached
/// through the transport, dispatcher, and registry handles.
pub struct Adapter {
    connection_id: String,
    identity: Option<RemoteIdentity>,
    triggers: TriggerSet,
    pending: PendingRequests,
    history: MessageHistory,
    republish_room: Option<String>,
    transport: Arc<dyn Transport>,
    dispatcher: Arc<dyn ActionDispatcher>,
    registry: Arc<dyn RoomRegistry>,
    completion_tx: mpsc::Sender<ActionCompletion>,
    completion_rx: mpsc::Receiver<ActionCompletion>,
}

impl Adapter {
    pub fn new(
        options: AdapterOptions,
        transport: Arc<dyn Transport>,
        dispatcher: Arc<dyn ActionDispatcher>,
        registry: Arc<dyn RoomRegistry>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_QUEUE_DEPTH);
        Self {
            connection_id: format!("conn-{}", uuid::Uuid::new_v4()),
            identity: None,
            triggers: options.triggers,
            pending: PendingRequests::new(),
            history: MessageHistory::new(options.messages_to_save),
            republish_room: options.republish_room,
            transport,
            dispatcher,
            registry,
            completion_tx,
            completion_rx,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Bot identity reported by the backend, once authenticated.
    pub fn identity(&self) -> Option<&RemoteIdentity> {
        self.identity.as_ref()
    }

    /// Messages seen so far (bounded by `messages_to_save`).
    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    /// In-flight action requests awaiting completion.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// File and attachment transfer is not supported; fails immediately.
    pub fn send_file(&self, _channel: &str, _filename: &str) -> Result<(), AdapterError> {
        Err(AdapterError::FilesNotSupported)
    }

    /// React to transport and host events until the connection closes. A clean
    /// close returns Ok, abandoning any still-pending requests; a transport
    /// failure is fatal and propagates.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<TransportEvent>,
    ) -> Result<(), AdapterError> {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(TransportEvent::Authenticated(identity)) => self.on_authenticated(identity),
                    Some(TransportEvent::Opened) => self.on_opened().await,
                    Some(TransportEvent::Message(message)) => self.on_message(message),
                    Some(TransportEvent::Closed) | None => {
                        self.on_closed();
                        return Ok(());
                    }
                    Some(TransportEvent::Failed(reason)) => {
                        self.transport.stop();
                        return Err(AdapterError::Transport(reason));
                    }
                },
                Some(completion) = self.completion_rx.recv() => {
                    self.on_completion(completion).await;
                }
            }
        }
    }

    fn on_authenticated(&mut self, identity: RemoteIdentity) {
        log::info!("logged in as {} of team {}", identity.user, identity.team);
        self.identity = Some(identity);
    }

    async fn on_opened(&mut self) {
        log::info!(
            "{} connection open ({})",
            self.transport.id(),
            self.connection_id
        );
        if let Some(room) = self.republish_room.clone() {
            if let Err(e) = self.registry.add_member(&self.connection_id, &room).await {
                log::warn!("joining republish room {} failed: {}", room, e);
            }
        }
    }

    /// Store the message, then dispatch it as an action if a trigger matches.
    /// Messages without text are skipped entirely.
    fn on_message(&mut self, message: InboundMessage) {
        if message.text.is_empty() {
            return;
        }
        self.history.record(message.clone());
        let matched = match self.triggers.first_match(&message.text) {
            Some(m) => m,
            None => return,
        };
        let sequence = self.pending.allocate(message.channel.as_str());
        log::debug!(
            "trigger {} matched action {:?} on {} (seq {})",
            matched.index,
            matched.action,
            message.channel,
            sequence
        );
        let request = ActionRequest {
            sequence,
            action: matched.action,
            message,
        };
        let dispatcher = Arc::clone(&self.dispatcher);
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(request, completions).await;
        });
    }

    /// Deliver one host completion: resolve the originating channel, format,
    /// send. The tracker entry is cleared before anything else — even when
    /// rendering is suppressed or the send fails, the correlation is gone.
    async fn on_completion(&mut self, completion: ActionCompletion) {
        let channel = match self.pending.resolve(completion.sequence) {
            Some(channel) => channel,
            None => {
                log::warn!(
                    "completion for unknown or already-resolved sequence {}; dropping (duplicate delivery?)",
                    completion.sequence
                );
                return;
            }
        };
        if !completion.to_render {
            log::debug!("completion {} suppressed (toRender false)", completion.sequence);
            return;
        }
        let text = format_response(&completion.result);
        if let Err(e) = self.transport.send_message(&channel, &text).await {
            log::error!("sending response to {} failed: {}", channel, e);
        }
    }

    fn on_closed(&mut self) {
        if !self.pending.is_empty() {
            log::warn!(
                "connection closed with {} pending request(s) abandoned",
                self.pending.len()
            );
        }
        self.transport.stop();
    }
}
