//! Hook type definitions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::events::HookEvent;
use crate::error::ArbiterResult;
use crate::policy::ToolContext;

/// Input handed to every hook of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookInput {
    pub event: HookEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    /// Event-specific structured payload
    pub data: Value,
    pub context: ToolContext,
}

impl HookInput {
    pub fn new(event: HookEvent, data: Value, context: ToolContext) -> Self {
        Self {
            event,
            tool_name: None,
            tool_use_id: None,
            data,
            context,
        }
    }

    pub fn with_tool(
        mut self,
        tool_name: impl Into<String>,
        tool_use_id: impl Into<String>,
    ) -> Self {
        self.tool_name = Some(tool_name.into());
        self.tool_use_id = Some(tool_use_id.into());
        self
    }

    pub fn with_tool_use_id(mut self, tool_use_id: impl Into<String>) -> Self {
        self.tool_use_id = Some(tool_use_id.into());
        self
    }
}

/// Outcome returned by each hook and by the pipeline as a whole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookOutcome {
    /// Whether execution may continue past this hook
    #[serde(default = "default_continue")]
    pub should_continue: bool,
    /// Optional structured output accumulated across the pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Mandatory explanation when a hook blocks continuation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

fn default_continue() -> bool {
    true
}

impl Default for HookOutcome {
    fn default() -> Self {
        Self::proceed()
    }
}

impl HookOutcome {
    /// Continue without output
    pub fn proceed() -> Self {
        Self {
            should_continue: true,
            output: None,
            block_reason: None,
        }
    }

    /// Continue and contribute structured output
    pub fn proceed_with(output: Value) -> Self {
        Self {
            should_continue: true,
            output: Some(output),
            block_reason: None,
        }
    }

    /// Stop the pipeline with a reason
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            should_continue: false,
            output: None,
            block_reason: Some(reason.into()),
        }
    }

    pub fn is_blocked(&self) -> bool {
        !self.should_continue
    }
}

/// A rule unit observing or intercepting one tool lifecycle event
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    /// Stable name for logging and diagnostics
    fn name(&self) -> &str;

    /// Run the hook
    ///
    /// An `Err` is logged by the pipeline and treated as `proceed()`; only
    /// an explicit blocking outcome stops execution.
    async fn run(&self, input: &HookInput) -> ArbiterResult<HookOutcome>;
}
