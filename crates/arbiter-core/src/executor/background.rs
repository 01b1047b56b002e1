//! Background (batch) execution

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::{run_event_loop, ExecutionOutput, ExecutionResult, ExecutorCore, SessionExecutor};
use crate::error::ArbiterResult;
use crate::interrupt::InterruptHandle;
use crate::recovery::RetryManager;

/// Runs the whole query/consume loop under retry protection and returns a
/// single aggregate result
///
/// Never raises past its own boundary: exhausted retries surface as a
/// structured failure result carrying the best-available metrics snapshot.
pub struct BackgroundExecutor {
    core: ExecutorCore,
    retry: RetryManager,
}

impl BackgroundExecutor {
    pub(crate) fn new(core: ExecutorCore, retry: RetryManager) -> Self {
        Self { core, retry }
    }
}

#[async_trait]
impl SessionExecutor for BackgroundExecutor {
    async fn execute(&mut self, prompt: &str) -> ArbiterResult<ExecutionOutput> {
        if let Err(blocked) = self.core.check_prompt(prompt).await {
            let snapshot = self.core.client.metrics().lock().snapshot();
            return Ok(ExecutionOutput::Completed(ExecutionResult::failure(
                &self.core.session_id,
                snapshot,
                blocked.to_string(),
            )));
        }

        let parts = self.core.event_parts(None);
        let gate = self.core.gate.clone();
        let prompt = prompt.to_string();
        let cancel = self.core.interrupt.token();
        let attempts = Arc::new(AtomicU32::new(0));

        let outcome = self
            .retry
            .execute_with_retry(
                || {
                    let parts = parts.clone();
                    let gate = gate.clone();
                    let prompt = prompt.clone();
                    let cancel = cancel.clone();
                    let attempts = attempts.clone();
                    async move {
                        if attempts.fetch_add(1, Ordering::SeqCst) > 0 {
                            parts.client.metrics().lock().record_retry();
                        }
                        let stream = parts.client.query(&prompt, Vec::new(), gate).await?;
                        run_event_loop(&parts, stream, None, &cancel).await
                    }
                },
                Some(&cancel),
            )
            .await;

        let result = match outcome {
            Ok((snapshot, event)) => {
                if event.is_error {
                    ExecutionResult::failure(
                        &self.core.session_id,
                        snapshot,
                        event
                            .result
                            .unwrap_or_else(|| "runtime reported an error result".to_string()),
                    )
                } else {
                    ExecutionResult::success(&self.core.session_id, snapshot, event.result)
                }
            }
            Err(final_error) => {
                let snapshot = self.core.error_handler.handle(&final_error).await;
                ExecutionResult::failure(&self.core.session_id, snapshot, final_error.to_string())
            }
        };

        Ok(ExecutionOutput::Completed(result))
    }

    fn interrupt_handle(&self) -> InterruptHandle {
        self.core.interrupt.clone()
    }
}
