//! Interactive (streaming) execution

use async_trait::async_trait;
use std::sync::Arc;

use super::{spawn_event_pump, ExecutionOutput, ExecutorCore, SessionExecutor};
use crate::error::ArbiterResult;
use crate::handlers::StreamHandler;
use crate::interrupt::InterruptHandle;

/// Streams assistant messages as they arrive
///
/// Each message is persisted before it is handed to the caller; partial
/// updates are forwarded to subscribers when a stream handler is attached.
pub struct InteractiveExecutor {
    core: ExecutorCore,
    stream_handler: Option<Arc<StreamHandler>>,
}

impl InteractiveExecutor {
    pub(crate) fn new(core: ExecutorCore, stream_handler: Option<Arc<StreamHandler>>) -> Self {
        Self {
            core,
            stream_handler,
        }
    }
}

#[async_trait]
impl SessionExecutor for InteractiveExecutor {
    async fn execute(&mut self, prompt: &str) -> ArbiterResult<ExecutionOutput> {
        self.core.check_prompt(prompt).await?;

        let stream = match self
            .core
            .client
            .query(prompt, Vec::new(), self.core.gate.clone())
            .await
        {
            Ok(stream) => stream,
            Err(query_error) => {
                // Mark the session failed before surfacing to the caller
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
