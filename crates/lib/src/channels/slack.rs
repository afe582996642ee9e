//! Slack transport: rtm.connect handshake, websocket event stream, and
//! chat.postMessage sends.

use crate::channels::inbound::InboundMessage;
use crate::channels::transport::{RemoteIdentity, Transport, TransportEvent};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;

const SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("slack request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("slack api error: {0}")]
    Api(String),
}

#[derive(Debug, Deserialize)]
struct RtmConnectResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "self", default)]
    who: Option<RtmSelf>,
    #[serde(default)]
    team: Option<RtmTeam>,
}

#[derive(Debug, Deserialize)]
struct RtmSelf {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RtmTeam {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// RTM event frame. Only the fields needed for routing are parsed; everything
/// else on the frame is ignored.
#[derive(Debug, Deserialize)]
struct RtmEvent {
    #[serde(rename = "type", default)]
    typ: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Slack transport connector: holds the realtime socket open and sends
/// replies via the chat.postMessage Web API.
pub struct SlackTransport {
    id: String,
    token: String,
    running: AtomicBool,
    client: reqwest::Client,
}

impl SlackTransport {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            id: "slack".to_string(),
            token: token.into(),
            running: AtomicBool::new(false),
            client: reqwest::Client::new(),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the RTM connection and forward connection events to the adapter.
    /// Returns a handle to await on shutdown.
    pub fn start_inbound(
        self: Arc<Self>,
        events_tx: mpsc::Sender<TransportEvent>,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("slack transport: starting rtm event loop");
        tokio::spawn(async move {
            run_rtm_loop(self, events_tx).await;
        })
    }

    /// Call rtm.connect. Returns the websocket URL and the bot identity.
    async fn rtm_connect(&self) -> Result<(String, RemoteIdentity), SlackError> {
        let url = format!("{}/rtm.connect", SLACK_API_BASE);
        let res = self
            .client
            .post(&url)
            .form(&[("token", self.token.as_str())])
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SlackError::Api(format!(
                "rtm.connect failed: {} {}",
                status, body
            )));
        }
        let data: RtmConnectResponse = res.json().await?;
        if !data.ok {
            return Err(SlackError::Api(format!(
                "rtm.connect returned ok: false ({})",
                data.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        let ws_url = data
            .url
            .ok_or_else(|| SlackError::Api("rtm.connect response had no url".to_string()))?;
        let identity = RemoteIdentity {
            user: data.who.map(|s| s.name).unwrap_or_default(),
            team: data.team.map(|t| t.name).unwrap_or_default(),
        };
        Ok((ws_url, identity))
    }

    /// Send a text message to a channel via chat.postMessage.
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError> {
        let url = format!("{}/chat.postMessage", SLACK_API_BASE);
        let body = serde_json::json!({ "channel": channel, "text": text });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SlackError::Api(format!(
                "chat.postMessage failed: {} {}",
                status, body
            )));
        }
        let data: PostMessageResponse = res.json().await?;
        if !data.ok {
            return Err(SlackError::Api(format!(
                "chat.postMessage returned ok: false ({})",
                data.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        Ok(())
    }
}

/// Connect and pump RTM events until the transport is stopped or the socket
/// fails. Handshake and socket errors are fatal for this connection.
async fn run_rtm_loop(transport: Arc<SlackTransport>, events_tx: mpsc::Sender<TransportEvent>) {
    let (ws_url, identity) = match transport.rtm_connect().await {
        Ok(r) => r,
        Err(e) => {
            let _ = events_tx.send(TransportEvent::Failed(e.to_string())).await;
            return;
        }
    };
    if events_tx
        .send(TransportEvent::Authenticated(identity))
        .await
        .is_err()
    {
        return;
    }
    let (ws, _) = match tokio_tungstenite::connect_async(ws_url.as_str()).await {
        Ok(c) => c,
        Err(e) => {
            let _ = events_tx
                .send(TransportEvent::Failed(format!(
                    "rtm websocket connect failed: {}",
                    e
                )))
                .await;
            return;
        }
    };
    let (mut write, mut read) = ws.split();
    while transport.running() {
        let frame = match read.next().await {
            Some(Ok(f)) => f,
            Some(Err(e)) => {
                let _ = events_tx
                    .send(TransportEvent::Failed(format!("rtm socket error: {}", e)))
                    .await;
                return;
            }
            None => break,
        };
        match frame {
            WsMessage::Text(payload) => {
                if let Some(event) = parse_rtm_event(&payload) {
                    if events_tx.send(event).await.is_err() {
                        log::debug!("slack: event channel closed, stopping loop");
                        return;
                    }
                }
            }
            WsMessage::Ping(data) => {
                let _ = write.send(WsMessage::Pong(data)).await;
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }
    let _ = events_tx.send(TransportEvent::Closed).await;
    log::info!("slack transport: rtm event loop stopped");
}

/// Parse one RTM frame into a transport event. Frames other than `hello` and
/// plain channel messages are skipped.
fn parse_rtm_event(payload: &str) -> Option<TransportEvent> {
    let event: RtmEvent = match serde_json::from_str(payload) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("slack: unparseable rtm frame: {}", e);
            return None;
        }
    };
    match event.typ.as_deref() {
        Some("hello") => Some(TransportEvent::Opened),
        Some("message") => {
            let channel = event.channel?;
            let sender = event.user?;
            Some(TransportEvent::Message(InboundMessage {
                // Subtyped frames (edits, joins) carry no text; the adapter
                // skips empty-text messages.
                text: event.text.unwrap_or_default(),
                channel,
                sender,
                received_at: chrono::Utc::now(),
            }))
        }
        _ => None,
    }
}

#[async_trait]
impl Transport for SlackTransport {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn send_message(&self, channel: &str, text: &str) -> Result<(), String> {
        self.post_message(channel, text).await.map_err(|e| e.to_string())
    }
}
