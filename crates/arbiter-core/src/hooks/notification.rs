//! Alert notification hook

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use super::events::HookEvent;
use super::types::{HookInput, HookOutcome, LifecycleHook};
use crate::error::ArbiterResult;
use crate::store::Broadcaster;

/// Priority the factory registers the notification hook at, after the
/// governing hooks
pub const NOTIFICATION_HOOK_PRIORITY: i32 = 50;

/// Publishes alerts on tool failures and on a configured tool subset
///
/// Strictly best-effort: publish failures are swallowed and the hook never
/// blocks.
pub struct NotificationHook {
    broadcaster: Arc<dyn Broadcaster>,
    watched_tools: HashSet<String>,
}

impl NotificationHook {
    pub fn new(broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            broadcaster,
            watched_tools: HashSet::new(),
        }
    }

    /// Also alert on every invocation of the given tools
    pub fn with_watched_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watched_tools = tools.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl LifecycleHook for NotificationHook {
    fn name(&self) -> &str {
        "notification"
    }

    async fn run(&self, input: &HookInput) -> ArbiterResult<HookOutcome> {
        if input.event != HookEvent::PostToolUse {
            return Ok(HookOutcome::proceed());
        }

        let tool_name = input.tool_name.as_deref().unwrap_or_default();
        let failed = input
            .data
            .get("is_error")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        if failed || self.watched_tools.contains(tool_name) {
            let payload = json!({
                "tool_name": tool_name,
                "tool_use_id": input.tool_use_id,
                "is_error": failed,
            });
            if let Err(error) = self
                .broadcaster
                .publish(&input.context.session_id, "tool_alert", payload)
                .await
            {
                warn!(error = %error, "Alert publish failed");
            }
        }

        Ok(HookOutcome::proceed())
    }
}
