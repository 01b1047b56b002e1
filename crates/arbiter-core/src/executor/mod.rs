//! Execution strategies
//!
//! One executor instance drives one session's query/response cycle against
//! the runtime. The strategy variants share the event-consumption loop here;
//! they differ in streaming behavior, retry protection, and conversational
//! context restoration.

pub mod background;
pub mod factory;
pub mod forked;
pub mod interactive;

pub use background::BackgroundExecutor;
pub use factory::{EngineCollaborators, EnginePolicyConfig, ExecutorFactory};
pub use forked::ForkedExecutor;
pub use interactive::InteractiveExecutor;

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{ArbiterError, ArbiterResult};
use crate::gate::ToolGate;
use crate::handlers::{ErrorHandler, MessageHandler, ResultHandler, StreamHandler};
use crate::hooks::{HookEvent, HookPipeline};
use crate::interrupt::InterruptHandle;
use crate::metrics::MetricsSnapshot;
use crate::policy::ToolContext;
use crate::runtime::connection::EventStream;
use crate::runtime::events::{AgentEvent, AssistantMessage, ResultEvent};
use crate::runtime::RuntimeClient;

/// Capacity of the message channel handed to streaming callers
const MESSAGE_CHANNEL_CAPACITY: usize = 64;

/// Aggregate outcome of one execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub session_id: String,
    /// Final textual result reported by the runtime
    pub final_text: Option<String>,
    pub metrics: MetricsSnapshot,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn success(
        session_id: impl Into<String>,
        metrics: MetricsSnapshot,
        final_text: Option<String>,
    ) -> Self {
        Self {
            success: true,
            session_id: session_id.into(),
            final_text,
            metrics,
            error: None,
        }
    }

    pub fn failure(
        session_id: impl Into<String>,
        metrics: MetricsSnapshot,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            session_id: session_id.into(),
            final_text: None,
            metrics,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// What `execute` hands back, depending on the strategy
#[derive(Debug)]
pub enum ExecutionOutput {
    /// Live stream of persisted assistant messages (interactive, forked)
    Stream(mpsc::Receiver<AssistantMessage>),
    /// Single aggregate result (background)
    Completed(ExecutionResult),
}

impl ExecutionOutput {
    /// The aggregate result, when the strategy produced one
    pub fn into_result(self) -> Option<ExecutionResult> {
        match self {
            ExecutionOutput::Completed(result) => Some(result),
            ExecutionOutput::Stream(_) => None,
        }
    }
}

/// One execution strategy over the runtime client
#[async_trait]
pub trait SessionExecutor: Send {
    /// Drive one query/response cycle for the given prompt
    async fn execute(&mut self, prompt: &str) -> ArbiterResult<ExecutionOutput>;

    /// Handle for cancelling the in-flight execution
    fn interrupt_handle(&self) -> InterruptHandle;
}

/// Everything an executor needs regardless of strategy
pub(crate) struct ExecutorCore {
    pub session_id: String,
    pub client: RuntimeClient,
    pub gate: Arc<dyn ToolGate>,
    pub hooks: HookPipeline,
    pub context: ToolContext,
    pub message_handler: Arc<MessageHandler>,
    pub result_handler: Arc<ResultHandler>,
    pub error_handler: Arc<ErrorHandler>,
    pub interrupt: InterruptHandle,
}

impl ExecutorCore {
    /// Run the user-prompt-submit hook stage; `Err` when a hook blocks
    pub(crate) async fn check_prompt(&self, prompt: &str) -> ArbiterResult<()> {
        let outcome = self
            .hooks
            .run(
                HookEvent::UserPromptSubmit,
                json!({ "prompt": prompt }),
                None,
                None,
                &self.context,
            )
            .await;
        if outcome.is_blocked() {
            let reason = outcome
                .block_reason
                .unwrap_or_else(|| "prompt blocked by hook".to_string());
            return Err(ArbiterError::hook(reason));
        }
        Ok(())
    }

    pub(crate) fn event_parts(&self, stream_handler: Option<Arc<StreamHandler>>) -> EventLoopParts {
        EventLoopParts {
            client: self.client.clone(),
            message_handler: self.message_handler.clone(),
            stream_handler,
            result_handler: self.result_handler.clone(),
            hooks: self.hooks.clone(),
            context: self.context.clone(),
        }
    }
}

/// Collaborators of the shared event-consumption loop
#[derive(Clone)]
pub(crate) struct EventLoopParts {
    pub client: RuntimeClient,
    pub message_handler: Arc<MessageHandler>,
    pub stream_handler: Option<Arc<StreamHandler>>,
    pub result_handler: Arc<ResultHandler>,
    pub hooks: HookPipeline,
    pub context: ToolContext,
}

/// Consume runtime events in arrival order until the terminal event
///
/// Cancellation is honored at the receive suspension point and forwarded to
/// the runtime. Messages are mirrored into `out` best-effort: a caller that
/// stopped reading cannot stall persistence.
pub(crate) async fn run_event_loop(
    parts: &EventLoopParts,
    mut stream: EventStream,
    out: Option<&mpsc::Sender<AssistantMessage>>,
    cancel: &CancellationToken,
) -> ArbiterResult<(MetricsSnapshot, ResultEvent)> {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = parts.client.interrupt().await;
                return Err(ArbiterError::Cancelled);
            }
            event = parts.client.recv_event(&mut stream) => event?,
        };

        match event {
            None => {
                return Err(ArbiterError::protocol(
                    "runtime stream ended without a terminal event",
                ));
            }
            Some(AgentEvent::Assistant(message)) => {
                parts.message_handler.handle(&message).await?;
                if let Some(tx) = out {
                    if let Err(send_error) = tx.try_send(message) {
                        debug!(error = %send_error, "Viewer channel not keeping up; message dropped");
                    }
                }
            }
            Some(AgentEvent::Stream(event)) => {
                if let Some(handler) = &parts.stream_handler {
                    handler.handle(&event).await;
                }
            }
            Some(AgentEvent::Result(event)) => {
                let _ = parts
                    .hooks
                    .run(
                        HookEvent::Stop,
                        json!({ "is_error": event.is_error }),
                        None,
                        None,
                        &parts.context,
                    )
                    .await;
                let snapshot = parts.result_handler.handle(&event).await?;
                return Ok((snapshot, event));
            }
        }
    }
}

/// Spawn the event loop for a streaming strategy
///
/// The returned receiver yields each assistant message after it has been
/// persisted. Loop failures are routed through the error handler, which
/// marks the session failed; the stream simply ends for the caller.
pub(crate) fn spawn_event_pump(
    parts: EventLoopParts,
    error_handler: Arc<ErrorHandler>,
    stream: EventStream,
    cancel: CancellationToken,
) -> mpsc::Receiver<AssistantMessage> {
    let (tx, rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        if let Err(run_error) = run_event_loop(&parts, stream, Some(&tx), &cancel).await {
            error!(
                session = %parts.context.session_id,
                error = %run_error,
                "Streaming execution failed"
            );
            error_handler.handle(&run_error).await;
        }
    });
    rx
}
