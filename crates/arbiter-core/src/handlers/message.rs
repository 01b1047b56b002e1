//! Assistant message handling

use parking_lot::Mutex;
use serde_json::json;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::error::ArbiterResult;
use crate::hooks::{HookEvent, HookPipeline};
use crate::metrics::SharedMetrics;
use crate::policy::ToolContext;
use crate::runtime::events::{AssistantMessage, ContentBlock};
use crate::store::{
    Broadcaster, MessageStore, StoredMessage, ToolCallRecord, ToolCallStatus, ToolCallStore,
};

/// Persists assistant messages and tracks tool-call lifecycles
///
/// Persistence failures propagate; broadcast failures are logged and
/// swallowed so live viewers can never abort the execution.
pub struct MessageHandler {
    messages: Arc<dyn MessageStore>,
    tool_calls: Arc<dyn ToolCallStore>,
    hooks: HookPipeline,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    metrics: SharedMetrics,
    context: ToolContext,
    /// Tool name and input by tool-use id, kept until the result arrives
    pending_tools: Mutex<HashMap<String, (String, Value)>>,
}

impl MessageHandler {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        tool_calls: Arc<dyn ToolCallStore>,
        hooks: HookPipeline,
        broadcaster: Option<Arc<dyn Broadcaster>>,
        metrics: SharedMetrics,
        context: ToolContext,
    ) -> Self {
        Self {
            messages,
            tool_calls,
            hooks,
            broadcaster,
            metrics,
            context,
            pending_tools: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one assistant message: persist, broadcast, track tool calls
    pub async fn handle(&self, message: &AssistantMessage) -> ArbiterResult<()> {
        self.metrics.lock().record_message();

        let stored = StoredMessage::from_assistant(&self.context.session_id, message);
        self.messages.append(&self.context.session_id, &stored).await?;

        if let Some(broadcaster) = &self.broadcaster {
            let payload = serde_json::to_value(message).unwrap_or(Value::Null);
            if let Err(error) = broadcaster
                .publish(&self.context.session_id, "message", payload)
                .await
            {
                warn!(
                    session = %self.context.session_id,
                    error = %error,
                    "Message broadcast failed"
                );
            }
        }

        for block in &message.content {
            match block {
                ContentBlock::ToolUse { id, name, input } => {
                    self.on_tool_use(id, name, input).await;
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => {
                    self.on_tool_result(tool_use_id, content, *is_error).await;
                }
                ContentBlock::Text { .. } => {}
            }
        }

        Ok(())
    }

    async fn on_tool_use(&self, id: &str, name: &str, input: &Value) {
        self.metrics.lock().record_tool_call();
        self.pending_tools
            .lock()
            .insert(id.to_string(), (name.to_string(), input.clone()));
    }

    async fn on_tool_result(&self, tool_use_id: &str, content: &Value, is_error: bool) {
        if is_error {
            self.metrics.lock().record_error();
        }

        let pending = self.pending_tools.lock().remove(tool_use_id);
        let (tool_name, input) = match pending {
            Some(entry) => entry,
            None => {
                warn!(tool_use_id, "Tool result without a matching tool use");
                (String::new(), Value::Null)
            }
        };

        let outcome = self
            .hooks
            .run(
                HookEvent::PostToolUse,
                json!({
                    "tool_use_id": tool_use_id,
                    "content": content,
                    "is_error": is_error,
                }),
                if tool_name.is_empty() {
                    None
                } else {
                    Some(tool_name.as_str())
                },
                Some(tool_use_id),
                &self.context,
            )
            .await;
        if outcome.is_blocked() {
            // Nothing left to stop after the fact; surfaced for operators
            warn!(
                tool_use_id,
                reason = outcome.block_reason.as_deref().unwrap_or("(none)"),
                "Post-tool-use hook requested a block after execution"
            );
        }

        let status = if is_error {
            ToolCallStatus::Failed
        } else {
            ToolCallStatus::Completed
        };
        let record = ToolCallRecord::pending(
            &self.context.session_id,
            tool_use_id,
            tool_name,
            input,
        )
        .with_status(status)
        .with_output(content.clone());

        if let Err(error) = self.tool_calls.upsert(&record).await {
            warn!(tool_use_id, error = %error, "Tool-call record upsert failed");
        }
    }
}
