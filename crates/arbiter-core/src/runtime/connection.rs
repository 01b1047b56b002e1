//! Connection trait for the external agent runtime

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::events::AgentEvent;
use crate::config::RuntimeConfig;
use crate::error::ArbiterResult;
use crate::gate::ToolGate;
use crate::store::StoredMessage;

/// Channel of runtime events for one query
pub type EventStream = mpsc::Receiver<AgentEvent>;

/// One query against the runtime
pub struct QueryRequest {
    pub session_id: String,
    pub prompt: String,
    /// Prior conversation restored for forked sessions; empty otherwise
    pub context: Vec<StoredMessage>,
    pub config: RuntimeConfig,
    /// Gate the runtime must consult before executing any tool
    pub gate: Arc<dyn ToolGate>,
}

/// Black-box boundary to the agent runtime
///
/// Implementations own transport, authentication, and the wire protocol.
/// The contract the engine relies on: `query` yields events in emission
/// order on the returned channel, every tool execution is preceded by a
/// `gate.check` call whose denial prevents the execution, and the stream
/// ends after the terminal result event.
#[async_trait]
pub trait RuntimeConnection: Send + Sync {
    /// Issue a query and stream its response events
    async fn query(&self, request: QueryRequest) -> ArbiterResult<EventStream>;

    /// Forward a cancellation to the runtime
    async fn interrupt(&self, session_id: &str) -> ArbiterResult<()>;
}
