//! End-to-end execution tests over a scripted runtime connection

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use arbiter_core::runtime::connection::{EventStream, QueryRequest};
use arbiter_core::{
    AgentEvent, ArbiterError, ArbiterResult, AssistantMessage, AuditLog, Broadcaster,
    ContentBlock, EngineCollaborators, ExecutionOutput, ExecutorFactory, MessageStore,
    MetricsSnapshot, MetricsStore, ResultEvent, RuntimeConnection, Session, SessionExecutor,
    SessionMode, SessionStatus, SessionStore, StoredMessage, TokenUsage, ToolCallRecord,
    ToolCallStatus, ToolCallStore, ToolContext, ToolInvocationRequest,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// One scripted response to a query
enum QueryScript {
    Fail(ArbiterError),
    Events(Vec<AgentEvent>),
}

/// Scripted stand-in for the agent runtime
///
/// Consults the gate for every tool-use block before emitting it, the way a
/// real connection must, and records each decision.
struct ScriptedConnection {
    scripts: Mutex<VecDeque<QueryScript>>,
    gate_decisions: Arc<Mutex<Vec<(String, bool)>>>,
    last_context: Arc<Mutex<Vec<StoredMessage>>>,
}

impl ScriptedConnection {
    fn new(scripts: Vec<QueryScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            gate_decisions: Arc::new(Mutex::new(Vec::new())),
            last_context: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl RuntimeConnection for ScriptedConnection {
    async fn query(&self, request: QueryRequest) -> ArbiterResult<EventStream> {
        *self.last_context.lock() = request.context.clone();

        let script = self
            .scripts
            .lock()
            .pop_front()
            .unwrap_or(QueryScript::Events(Vec::new()));

        let events = match script {
            QueryScript::Fail(error) => return Err(error),
            QueryScript::Events(events) => events,
        };

        let (tx, rx) = mpsc::channel(32);
        let gate = request.gate;
        let decisions = self.gate_decisions.clone();
        let session_id = request.session_id;
        let working_dir = request.config.working_dir.clone();

        tokio::spawn(async move {
            for event in events {
                if let AgentEvent::Assistant(message) = &event {
                    for block in &message.content {
                        if let ContentBlock::ToolUse { id, name, input } = block {
                            let mut context = ToolContext::new(&session_id);
                            if let Some(dir) = &working_dir {
                                context = context.with_working_dir(dir.clone());
                            }
                            let decision = gate
                                .check(&ToolInvocationRequest::new(
                                    name,
                                    id,
                                    input.clone(),
                                    context,
                                ))
                                .await;
                            decisions.lock().push((name.clone(), decision.is_allowed()));
                        }
                    }
                }
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }

    async fn interrupt(&self, _session_id: &str) -> ArbiterResult<()> {
        Ok(())
    }
}

/// Shared in-memory persistence backing all collaborator traits
#[derive(Default, Clone)]
struct MemoryBackend {
    messages: Arc<Mutex<Vec<StoredMessage>>>,
    parent_history: Arc<Mutex<HashMap<String, Vec<StoredMessage>>>>,
    history_unavailable: Arc<AtomicBool>,
    tool_calls: Arc<Mutex<HashMap<String, ToolCallRecord>>>,
    metrics: Arc<Mutex<Vec<MetricsSnapshot>>>,
    statuses: Arc<Mutex<Vec<(SessionStatus, Option<String>)>>>,
    audits: Arc<Mutex<Vec<String>>>,
    broadcasts: Arc<Mutex<Vec<(String, Value)>>>,
}

#[async_trait]
impl MessageStore for MemoryBackend {
    async fn append(&self, _session_id: &str, message: &StoredMessage) -> ArbiterResult<()> {
        self.messages.lock().push(message.clone());
        Ok(())
    }

    async fn history(
        &self,
        session_id: &str,
        _up_to: Option<Uuid>,
    ) -> ArbiterResult<Vec<StoredMessage>> {
        if self.history_unavailable.load(Ordering::SeqCst) {
            return Err(ArbiterError::storage("history unavailable"));
        }
        Ok(self
            .parent_history
            .lock()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ToolCallStore for MemoryBackend {
    async fn upsert(&self, record: &ToolCallRecord) -> ArbiterResult<()> {
        self.tool_calls
            .lock()
            .insert(record.tool_use_id.clone(), record.clone());
        Ok(())
    }
}

#[async_trait]
impl MetricsStore for MemoryBackend {
    async fn snapshot(&self, _session_id: &str, metrics: &MetricsSnapshot) -> ArbiterResult<()> {
        self.metrics.lock().push(metrics.clone());
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryBackend {
    async fn update_status(
        &self,
        _session_id: &str,
        status: SessionStatus,
        error_message: Option<String>,
    ) -> ArbiterResult<()> {
        self.statuses.lock().push((status, error_message));
        Ok(())
    }
}

#[async_trait]
impl AuditLog for MemoryBackend {
    async fn record(
        &self,
        event_type: &str,
        _category: &str,
        _session_id: &str,
        _details: Value,
    ) -> ArbiterResult<()> {
        self.audits.lock().push(event_type.to_string());
        Ok(())
    }
}

#[async_trait]
impl Broadcaster for MemoryBackend {
    async fn publish(
        &self,
        _session_id: &str,
        event_type: &str,
        payload: Value,
    ) -> ArbiterResult<()> {
        self.broadcasts
            .lock()
            .push((event_type.to_string(), payload));
        Ok(())
    }
}

fn text_message(text: &str) -> AgentEvent {
    AgentEvent::Assistant(AssistantMessage::new(
        "sonnet",
        vec![ContentBlock::Text {
            text: text.to_string(),
        }],
    ))
}

fn result_event(is_error: bool) -> AgentEvent {
    AgentEvent::Result(ResultEvent {
        id: Uuid::new_v4(),
        duration_ms: 800,
        total_cost_usd: 0.01,
        num_turns: 1,
        usage: TokenUsage {
            input_tokens: 50,
            output_tokens: 20,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
        },
        is_error,
        result: Some(if is_error { "boom" } else { "all done" }.to_string()),
    })
}

struct Harness {
    factory: ExecutorFactory,
    backend: MemoryBackend,
    connection: Arc<ScriptedConnection>,
}

fn harness(scripts: Vec<QueryScript>) -> Harness {
    let backend = MemoryBackend::default();
    let connection = Arc::new(ScriptedConnection::new(scripts));
    let collaborators = EngineCollaborators {
        connection: connection.clone(),
        messages: Arc::new(backend.clone()),
        tool_calls: Arc::new(backend.clone()),
        metrics: Arc::new(backend.clone()),
        sessions: Arc::new(backend.clone()),
        audit: Arc::new(backend.clone()),
        broadcaster: Some(Arc::new(backend.clone())),
    };
    Harness {
        factory: ExecutorFactory::new(collaborators),
        backend,
        connection,
    }
}

async fn drain(mut rx: mpsc::Receiver<AssistantMessage>) -> Vec<AssistantMessage> {
    let mut received = Vec::new();
    while let Some(message) = rx.recv().await {
        received.push(message);
    }
    received
}

#[tokio::test]
async fn interactive_execution_streams_persists_and_completes() {
    init_tracing();
    let harness = harness(vec![QueryScript::Events(vec![
        text_message("working on it"),
        result_event(false),
    ])]);

    let session = Session::new("s-1", SessionMode::Interactive, "sonnet");
    let mut executor = harness.factory.create(&session).unwrap();

    let output = executor.execute("do the thing").await.unwrap();
    let ExecutionOutput::Stream(rx) = output else {
        panic!("interactive execution must stream");
    };

    let received = drain(rx).await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].text(), "working on it");

    // Message persisted before it reached the viewer
    assert_eq!(harness.backend.messages.lock().len(), 1);

    // Terminal event finalized metrics and completed the session
    let metrics = harness.backend.metrics.lock();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].message_count, 1);
    assert_eq!(metrics[0].usage.input_tokens, 50);
    assert!(metrics[0].completed_at.is_some());

    let statuses = harness.backend.statuses.lock();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].0, SessionStatus::Completed);

    // The assistant message was also broadcast to live viewers
    assert!(harness
        .backend
        .broadcasts
        .lock()
        .iter()
        .any(|(event_type, _)| event_type == "message"));
}

#[tokio::test]
async fn background_retries_transient_failures_then_succeeds() {
    init_tracing();
    // Scenario: the first two queries fail with a connection error, the
    // third succeeds; with max_retries >= 2 the execution must succeed and
    // the session must never be marked failed.
    let harness = harness(vec![
        QueryScript::Fail(ArbiterError::connection("connection refused")),
        QueryScript::Fail(ArbiterError::connection("connection refused")),
        QueryScript::Events(vec![text_message("recovered"), result_event(false)]),
    ]);

    let session = Session::new("s-2", SessionMode::Background, "sonnet")
        .with_max_retries(2)
        .with_retry_delay(Duration::from_millis(10));
    let mut executor = harness.factory.create(&session).unwrap();

    let result = executor
        .execute("run the batch")
        .await
        .unwrap()
        .into_result()
        .expect("background execution must aggregate");

    assert!(result.is_success());
    assert_eq!(result.final_text.as_deref(), Some("all done"));
    assert_eq!(result.metrics.retry_count, 2);

    let statuses = harness.backend.statuses.lock();
    assert!(statuses.iter().all(|(s, _)| *s != SessionStatus::Failed));
}

#[tokio::test]
async fn background_exhaustion_returns_structured_failure() {
    let harness = harness(vec![
        QueryScript::Fail(ArbiterError::connection("refused")),
        QueryScript::Fail(ArbiterError::connection("refused")),
    ]);

    let session = Session::new("s-3", SessionMode::Background, "sonnet")
        .with_max_retries(1)
        .with_retry_delay(Duration::from_millis(10));
    let mut executor = harness.factory.create(&session).unwrap();

    // Never raises past the executor boundary
    let result = executor
        .execute("run the batch")
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert!(!result.is_success());
    assert!(result.error.as_deref().unwrap_or_default().contains("refused"));

    let statuses = harness.backend.statuses.lock();
    assert!(statuses
        .iter()
        .any(|(s, message)| *s == SessionStatus::Failed
            && message.as_deref().unwrap_or_default().contains("refused")));
    assert!(harness
        .backend
        .audits
        .lock()
        .iter()
        .any(|event| event == "execution_failed"));
}

#[tokio::test]
async fn background_fatal_error_bypasses_retry() {
    let harness = harness(vec![
        QueryScript::Fail(ArbiterError::protocol("malformed frame")),
        QueryScript::Events(vec![result_event(false)]),
    ]);

    let session = Session::new("s-4", SessionMode::Background, "sonnet")
        .with_max_retries(3)
        .with_retry_delay(Duration::from_millis(10));
    let mut executor = harness.factory.create(&session).unwrap();

    let result = executor.execute("x").await.unwrap().into_result().unwrap();
    assert!(!result.is_success());
    // The second (successful) script was never consumed
    assert_eq!(harness.connection.scripts.lock().len(), 1);
}

#[tokio::test]
async fn tool_uses_are_gated_before_execution() {
    let tool_use = AgentEvent::Assistant(AssistantMessage::new(
        "sonnet",
        vec![ContentBlock::ToolUse {
            id: "tu-read".to_string(),
            name: "read".to_string(),
            input: json!({"path": "/tmp/notes.txt"}),
        }],
    ));
    let tool_result = AgentEvent::Assistant(AssistantMessage::new(
        "sonnet",
        vec![ContentBlock::ToolResult {
            tool_use_id: "tu-read".to_string(),
            content: json!("notes"),
            is_error: false,
        }],
    ));
    let denied_use = AgentEvent::Assistant(AssistantMessage::new(
        "sonnet",
        vec![ContentBlock::ToolUse {
            id: "tu-bash".to_string(),
            name: "bash".to_string(),
            input: json!({"command": "ls"}),
        }],
    ));

    let harness = harness(vec![QueryScript::Events(vec![
        tool_use,
        tool_result,
        denied_use,
        result_event(false),
    ])]);

    let session = Session::new("s-5", SessionMode::Interactive, "sonnet")
        .with_allowed_tools(vec!["read".to_string()]);
    let mut executor = harness.factory.create(&session).unwrap();

    let ExecutionOutput::Stream(rx) = executor.execute("read my notes").await.unwrap() else {
        panic!("expected stream");
    };
    drain(rx).await;

    // The connection consulted the gate for both invocations, in order
    let decisions = harness.connection.gate_decisions.lock();
    assert_eq!(
        *decisions,
        vec![("read".to_string(), true), ("bash".to_string(), false)]
    );

    let tool_calls = harness.backend.tool_calls.lock();
    assert_eq!(tool_calls["tu-read"].status, ToolCallStatus::Completed);
    assert_eq!(tool_calls["tu-read"].output, Some(json!("notes")));
    assert_eq!(tool_calls["tu-bash"].status, ToolCallStatus::Denied);
    assert!(tool_calls["tu-bash"]
        .deny_reason
        .as_deref()
        .unwrap_or_default()
        .contains("allow-list"));

    // Denial was audited
    assert!(harness
        .backend
        .audits
        .lock()
        .iter()
        .any(|event| event == "tool_denied"));
}

#[tokio::test]
async fn forked_execution_restores_parent_context() {
    let harness = harness(vec![QueryScript::Events(vec![
        text_message("continuing"),
        result_event(false),
    ])]);

    // Seed the parent conversation
    let parent_message = StoredMessage::from_assistant(
        "s-parent",
        &AssistantMessage::new(
            "sonnet",
            vec![ContentBlock::Text {
                text: "earlier work".to_string(),
            }],
        ),
    );
    harness
        .backend
        .parent_history
        .lock()
        .insert("s-parent".to_string(), vec![parent_message]);

    let session =
        Session::new("s-6", SessionMode::Forked, "sonnet").with_parent("s-parent", None);
    let mut executor = harness.factory.create(&session).unwrap();

    let ExecutionOutput::Stream(rx) = executor.execute("keep going").await.unwrap() else {
        panic!("expected stream");
    };
    drain(rx).await;

    let restored = harness.connection.last_context.lock();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].session_id, "s-parent");
}

#[tokio::test]
async fn forked_execution_degrades_without_parent_history() {
    let harness = harness(vec![QueryScript::Events(vec![
        text_message("continuing anyway"),
        result_event(false),
    ])]);
    harness
        .backend
        .history_unavailable
        .store(true, Ordering::SeqCst);

    let session =
        Session::new("s-7", SessionMode::Forked, "sonnet").with_parent("s-parent", None);
    let mut executor = harness.factory.create(&session).unwrap();

    // Restoration failure must not fail the execution
    let ExecutionOutput::Stream(rx) = executor.execute("keep going").await.unwrap() else {
        panic!("expected stream");
    };
    let received = drain(rx).await;
    assert_eq!(received.len(), 1);
    assert!(harness.connection.last_context.lock().is_empty());

    let statuses = harness.backend.statuses.lock();
    assert_eq!(statuses.last().unwrap().0, SessionStatus::Completed);
}

#[tokio::test]
async fn interactive_query_failure_marks_session_failed_and_propagates() {
    let harness = harness(vec![QueryScript::Fail(ArbiterError::protocol(
        "handshake rejected",
    ))]);

    let session = Session::new("s-8", SessionMode::Interactive, "sonnet");
    let mut executor = harness.factory.create(&session).unwrap();

    let error = executor.execute("hello").await.unwrap_err();
    assert!(matches!(error, ArbiterError::Protocol(_)));

    let statuses = harness.backend.statuses.lock();
    assert!(statuses.iter().any(|(s, _)| *s == SessionStatus::Failed));
}

#[tokio::test]
async fn error_result_event_marks_session_failed() {
    let harness = harness(vec![QueryScript::Events(vec![result_event(true)])]);

    let session = Session::new("s-9", SessionMode::Background, "sonnet")
        .with_retry_delay(Duration::from_millis(10));
    let mut executor = harness.factory.create(&session).unwrap();

    let result = executor.execute("x").await.unwrap().into_result().unwrap();
    assert!(!result.is_success());
    assert_eq!(result.error.as_deref(), Some("boom"));

    let statuses = harness.backend.statuses.lock();
    assert!(statuses.iter().any(|(s, _)| *s == SessionStatus::Failed));
}
