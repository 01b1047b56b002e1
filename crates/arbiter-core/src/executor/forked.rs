//! Forked (continuation) execution

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{spawn_event_pump, ExecutionOutput, ExecutorCore, SessionExecutor};
use crate::error::ArbiterResult;
use crate::handlers::StreamHandler;
use crate::interrupt::InterruptHandle;
use crate::store::{MessageStore, StoredMessage};

/// Continues a parent session's conversation
///
/// Prior messages are restored from the parent (up to an optional fork
/// point) to rebuild conversational context; after restoration the path is
/// identical to the interactive one. Restoration failure degrades to an
/// empty context instead of failing the execution.
pub struct ForkedExecutor {
    core: ExecutorCore,
    stream_handler: Option<Arc<StreamHandler>>,
    messages: Arc<dyn MessageStore>,
    parent_session_id: String,
    fork_point: Option<Uuid>,
}

impl ForkedExecutor {
    pub(crate) fn new(
        core: ExecutorCore,
        stream_handler: Option<Arc<StreamHandler>>,
        messages: Arc<dyn MessageStore>,
        parent_session_id: String,
        fork_point: Option<Uuid>,
    ) -> Self {
        Self {
            core,
            stream_handler,
            messages,
            parent_session_id,
            fork_point,
        }
    }

    /// Restore the parent conversation, degrading to empty on failure
    async fn restore_context(&self) -> Vec<StoredMessage> {
        match self
            .messages
            .history(&self.parent_session_id, self.fork_point)
            .await
        {
            Ok(history) => {
                debug!(
                    session = %self.core.session_id,
                    parent = %self.parent_session_id,
                    messages = history.len(),
                    "Restored parent conversation context"
                );
                history
            }
            Err(restore_error) => {
                warn!(
                    session = %self.core.session_id,
                    parent = %self.parent_session_id,
                    error = %restore_error,
                    "Context restoration unavailable; continuing without parent context"
                );
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SessionExecutor for ForkedExecutor {
    async fn execute(&mut self, prompt: &str) -> ArbiterResult<ExecutionOutput> {
        self.core.check_prompt(prompt).await?;

        let context = self.restore_context().await;

        let stream = match self
            .core
            .client
            .query(prompt, context, self.core.gate.clone())
            .await
        {
            Ok(stream) => stream,
            Err(query_error) => {
                self.core.error_handler.handle(&query_error).await;
                return Err(query_error);
            }
        };

        let receiver = spawn_event_pump(
            self.core.event_parts(self.stream_handler.clone()),
            self.core.error_handler.clone(),
            stream,
            self.core.interrupt.token(),
        );
        Ok(ExecutionOutput::Stream(receiver))
    }

    fn interrupt_handle(&self) -> InterruptHandle {
        self.core.interrupt.clone()
    }
}
