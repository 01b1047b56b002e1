//! Per-session runtime client

use std::sync::Arc;
use tokio::time::timeout;
use tracing::debug;

use super::connection::{EventStream, QueryRequest, RuntimeConnection};
use super::events::AgentEvent;
use crate::config::RuntimeConfig;
use crate::error::{ArbiterError, ArbiterResult};
use crate::gate::ToolGate;
use crate::metrics::{RuntimeMetrics, SharedMetrics};
use crate::store::StoredMessage;

/// Client for one session's conversations with the agent runtime
///
/// Owns the validated configuration and the session-scoped metrics for its
/// whole lifetime. The configured timeout is enforced here, at the client
/// boundary: on query acceptance and on every stream receive.
#[derive(Clone)]
pub struct RuntimeClient {
    connection: Arc<dyn RuntimeConnection>,
    config: RuntimeConfig,
    session_id: String,
    metrics: SharedMetrics,
}

impl RuntimeClient {
    pub fn new(
        connection: Arc<dyn RuntimeConnection>,
        config: RuntimeConfig,
        session_id: impl Into<String>,
    ) -> Self {
        let session_id = session_id.into();
        let metrics = RuntimeMetrics::shared(session_id.clone());
        Self {
            connection,
            config,
            session_id,
            metrics,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Shared handle to this session's metrics
    pub fn metrics(&self) -> SharedMetrics {
        self.metrics.clone()
    }

    /// Issue a query with the given restored context and tool gate
    pub async fn query(
        &self,
        prompt: &str,
        context: Vec<StoredMessage>,
        gate: Arc<dyn ToolGate>,
    ) -> ArbiterResult<EventStream> {
        debug!(
            session = %self.session_id,
            model = %self.config.model,
            streaming = self.config.streaming,
            context_messages = context.len(),
            "Issuing runtime query"
        );

        let request = QueryRequest {
            session_id: self.session_id.clone(),
            prompt: prompt.to_string(),
            context,
            config: self.config.clone(),
            gate,
        };

        match timeout(self.config.timeout, self.connection.query(request)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(error)) => {
                self.metrics.lock().record_error();
                Err(error)
            }
            Err(_) => {
                self.metrics.lock().record_error();
                Err(ArbiterError::timeout(self.config.timeout.as_secs()))
            }
        }
    }

    /// Receive the next event, bounded by the configured timeout
    ///
    /// `Ok(None)` means the runtime closed the stream.
    pub async fn recv_event(&self, stream: &mut EventStream) -> ArbiterResult<Option<AgentEvent>> {
        match timeout(self.config.timeout, stream.recv()).await {
            Ok(event) => Ok(event),
            Err(_) => {
                self.metrics.lock().record_error();
                Err(ArbiterError::timeout(self.config.timeout.as_secs()))
            }
        }
    }

    /// Forward a cancellation to the runtime
    pub async fn interrupt(&self) -> ArbiterResult<()> {
        self.connection.interrupt(&self.session_id).await
    }
}
