//! Integration tests: drive the adapter run loop end to end with a scripted
//! transport and dispatcher, and assert on what reaches the transport.

use async_trait::async_trait;
use lib::adapter::{Adapter, AdapterError, AdapterOptions};
use lib::channels::{InboundMessage, RemoteIdentity, Transport, TransportEvent};
use lib::host::{ActionCompletion, ActionDispatcher, ActionRequest, RoomRegistry};
use lib::response::ActionResult;
use lib::triggers::TriggerSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

struct FakeTransport {
    sent: Mutex<Vec<(String, String)>>,
    stopped: AtomicBool,
}

impl FakeTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        })
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn id(&self) -> &str {
        "fake"
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    async fn send_message(&self, channel: &str, text: &str) -> Result<(), String> {
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }
}

/// Completes every request with "done". Optionally suppresses rendering or
/// delivers the completion twice (a duplicate-delivery host bug).
struct ScriptedDispatcher {
    render: bool,
    duplicate: bool,
    dispatched: Mutex<Vec<String>>,
}

impl ScriptedDispatcher {
    fn new(render: bool, duplicate: bool) -> Arc<Self> {
        Arc::new(Self {
            render,
            duplicate,
            dispatched: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ActionDispatcher for ScriptedDispatcher {
    async fn dispatch(&self, request: ActionRequest, completions: mpsc::Sender<ActionCompletion>) {
        self.dispatched.lock().unwrap().push(request.action.clone());
        let completion = ActionCompletion {
            sequence: request.sequence,
            result: ActionResult::Text("done".to_string()),
            to_render: self.render,
        };
        if self.duplicate {
            let _ = completions.send(completion.clone()).await;
        }
        let _ = completions.send(completion).await;
    }
}

struct RecordingRegistry {
    joins: Mutex<Vec<(String, String)>>,
}

impl RecordingRegistry {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            joins: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl RoomRegistry for RecordingRegistry {
    async fn add_member(&self, connection_id: &str, room: &str) -> Result<(), String> {
        self.joins
            .lock()
            .unwrap()
            .push((connection_id.to_string(), room.to_string()));
        Ok(())
    }
}

fn options(patterns: &[&str], republish_room: Option<&str>) -> AdapterOptions {
    let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
    AdapterOptions {
        triggers: TriggerSet::compile(&patterns).expect("compile triggers"),
        messages_to_save: 100,
        republish_room: republish_room.map(|s| s.to_string()),
    }
}

fn message(text: &str, channel: &str) -> TransportEvent {
    TransportEvent::Message(InboundMessage {
        text: text.to_string(),
        channel: channel.to_string(),
        sender: "U123".to_string(),
        received_at: chrono::Utc::now(),
    })
}

fn identity() -> RemoteIdentity {
    RemoteIdentity {
        user: "relay-bot".to_string(),
        team: "acme".to_string(),
    }
}

async fn wait_for_sends(transport: &FakeTransport, count: usize) {
    for _ in 0..100 {
        if transport.sent().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "expected {} send(s) within 2s, saw {:?}",
        count,
        transport.sent()
    );
}

#[tokio::test]
async fn end_to_end_action_flow() {
    let transport = FakeTransport::new();
    let dispatcher = ScriptedDispatcher::new(true, false);
    let registry = RecordingRegistry::new();
    let adapter = Adapter::new(
        options(&[r"(?i)^action\s(\w+).*$"], Some("slack")),
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&dispatcher) as Arc<dyn ActionDispatcher>,
        Arc::clone(&registry) as Arc<dyn RoomRegistry>,
    );
    let (events_tx, events_rx) = mpsc::channel(16);
    let run = tokio::spawn(adapter.run(events_rx));

    events_tx
        .send(TransportEvent::Authenticated(identity()))
        .await
        .unwrap();
    events_tx.send(TransportEvent::Opened).await.unwrap();
    events_tx.send(message("action foo", "C1")).await.unwrap();

    wait_for_sends(&transport, 1).await;
    assert_eq!(
        transport.sent(),
        vec![("C1".to_string(), "done".to_string())]
    );
    assert_eq!(
        dispatcher.dispatched.lock().unwrap().clone(),
        vec!["foo".to_string()]
    );
    assert_eq!(registry.joins.lock().unwrap().len(), 1);

    events_tx.send(TransportEvent::Closed).await.unwrap();
    run.await.unwrap().unwrap();
    assert!(transport.stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn duplicate_completion_sends_exactly_once() {
    let transport = FakeTransport::new();
    let dispatcher = ScriptedDispatcher::new(true, true);
    let adapter = Adapter::new(
        options(&[r"^action\s(\w+)$"], None),
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&dispatcher) as Arc<dyn ActionDispatcher>,
        RecordingRegistry::new() as Arc<dyn RoomRegistry>,
    );
    let (events_tx, events_rx) = mpsc::channel(16);
    let run = tokio::spawn(adapter.run(events_rx));

    events_tx.send(TransportEvent::Opened).await.unwrap();
    events_tx.send(message("action once", "C1")).await.unwrap();

    wait_for_sends(&transport, 1).await;
    // Give the stale duplicate a chance to (wrongly) produce a second send.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(transport.sent().len(), 1);

    events_tx.send(TransportEvent::Closed).await.unwrap();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn render_false_suppresses_the_response() {
    let transport = FakeTransport::new();
    let dispatcher = ScriptedDispatcher::new(false, false);
    let adapter = Adapter::new(
        options(&[r"^action\s(\w+)$"], None),
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&dispatcher) as Arc<dyn ActionDispatcher>,
        RecordingRegistry::new() as Arc<dyn RoomRegistry>,
    );
    let (events_tx, events_rx) = mpsc::channel(16);
    let run = tokio::spawn(adapter.run(events_rx));

    events_tx.send(TransportEvent::Opened).await.unwrap();
    events_tx.send(message("action quiet", "C1")).await.unwrap();

    // Wait for the dispatch itself, then make sure nothing was sent.
    for _ in 0..100 {
        if !dispatcher.dispatched.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(transport.sent().is_empty());

    events_tx.send(TransportEvent::Closed).await.unwrap();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn unmatched_and_empty_messages_never_dispatch() {
    let transport = FakeTransport::new();
    let dispatcher = ScriptedDispatcher::new(true, false);
    let adapter = Adapter::new(
        options(&[r"^action\s(\w+)$"], None),
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&dispatcher) as Arc<dyn ActionDispatcher>,
        RecordingRegistry::new() as Arc<dyn RoomRegistry>,
    );
    let (events_tx, events_rx) = mpsc::channel(16);
    let run = tokio::spawn(adapter.run(events_rx));

    events_tx.send(TransportEvent::Opened).await.unwrap();
    events_tx.send(message("just chatting", "C1")).await.unwrap();
    events_tx.send(message("", "C1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(dispatcher.dispatched.lock().unwrap().is_empty());
    assert!(transport.sent().is_empty());

    events_tx.send(TransportEvent::Closed).await.unwrap();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn transport_failure_is_fatal() {
    let transport = FakeTransport::new();
    let adapter = Adapter::new(
        options(&[r"^action\s(\w+)$"], None),
        Arc::clone(&transport) as Arc<dyn Transport>,
        ScriptedDispatcher::new(true, false) as Arc<dyn ActionDispatcher>,
        RecordingRegistry::new() as Arc<dyn RoomRegistry>,
    );
    let (events_tx, events_rx) = mpsc::channel(16);
    let run = tokio::spawn(adapter.run(events_rx));

    events_tx
        .send(TransportEvent::Failed("socket error".to_string()))
        .await
        .unwrap();

    let err = run.await.unwrap().unwrap_err();
    assert!(matches!(err, AdapterError::Transport(_)));
    assert!(err.to_string().contains("socket error"));
    assert!(transport.stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn dropping_the_event_stream_is_a_clean_close() {
    let transport = FakeTransport::new();
    let adapter = Adapter::new(
        options(&[], None),
        Arc::clone(&transport) as Arc<dyn Transport>,
        ScriptedDispatcher::new(true, false) as Arc<dyn ActionDispatcher>,
        RecordingRegistry::new() as Arc<dyn RoomRegistry>,
    );
    let (events_tx, events_rx) = mpsc::channel::<TransportEvent>(16);
    let run = tokio::spawn(adapter.run(events_rx));

    drop(events_tx);
    run.await.unwrap().unwrap();
    assert!(transport.stopped.load(Ordering::SeqCst));
}
