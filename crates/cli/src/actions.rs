//! Built-in dispatcher and room registry used by `slackline run`.
//!
//! Stand-ins for a real host framework: a couple of demo actions and a
//! registry that only logs membership changes. The library never depends on
//! these.

use async_trait::async_trait;
use lib::host::{ActionCompletion, ActionDispatcher, ActionRequest, RoomRegistry};
use lib::response::ActionResult;
use std::time::Instant;
use tokio::sync::mpsc;

/// Answers `status` and `echo`; everything else completes with an error
/// payload so the formatter's error path is what the channel sees.
pub struct BuiltinDispatcher {
    started_at: Instant,
}

impl BuiltinDispatcher {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }
}

#[async_trait]
impl ActionDispatcher for BuiltinDispatcher {
    async fn dispatch(&self, request: ActionRequest, completions: mpsc::Sender<ActionCompletion>) {
        let result = match request.action.as_str() {
            "echo" => ActionResult::Text(request.message.text.clone()),
            "status" => {
                let mut fields = serde_json::Map::new();
                fields.insert("name".to_string(), serde_json::json!("slackline"));
                fields.insert(
                    "version".to_string(),
                    serde_json::json!(env!("CARGO_PKG_VERSION")),
                );
                fields.insert(
                    "uptime".to_string(),
                    serde_json::json!(self.started_at.elapsed().as_secs()),
                );
                ActionResult::Payload(fields)
            }
            other => {
                let mut fields = serde_json::Map::new();
                fields.insert(
                    "error".to_string(),
                    serde_json::json!(format!("unknown action: {}", other)),
                );
                ActionResult::Payload(fields)
            }
        };
        let completion = ActionCompletion {
            sequence: request.sequence,
            result,
            to_render: true,
        };
        let _ = completions.send(completion).await;
    }
}

/// Standalone runs have no host chat rooms; membership changes are only
/// logged.
pub struct LoggingRegistry;

#[async_trait]
impl RoomRegistry for LoggingRegistry {
    async fn add_member(&self, connection_id: &str, room: &str) -> Result<(), String> {
        log::info!("{} joined republish room {}", connection_id, room);
        Ok(())
    }
}
