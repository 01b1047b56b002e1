//! Sequential hook execution

use serde_json::Value;
use tracing::{debug, warn};

use super::events::HookEvent;
use super::registry::HookRegistry;
use super::types::{HookInput, HookOutcome};
use crate::policy::ToolContext;

/// Runs all hooks for an event in priority order
///
/// Side effects accumulate across hooks; the first hook returning an
/// explicit blocking outcome stops the run and its outcome is surfaced.
/// Hook failures are fail-open: logged and treated as "no opinion".
#[derive(Clone, Default)]
pub struct HookPipeline {
    registry: HookRegistry,
}

impl HookPipeline {
    pub fn new(registry: HookRegistry) -> Self {
        Self { registry }
    }

    /// The underlying registry, for registration after construction
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Run the pipeline for one event
    pub async fn run(
        &self,
        event: HookEvent,
        data: Value,
        tool_name: Option<&str>,
        tool_use_id: Option<&str>,
        context: &ToolContext,
    ) -> HookOutcome {
        let hooks = self.registry.hooks_for(event);
        if hooks.is_empty() {
            return HookOutcome::proceed();
        }

        let mut input = HookInput::new(event, data, context.clone());
        if let Some(name) = tool_name {
            input.tool_name = Some(name.to_string());
        }
        if let Some(id) = tool_use_id {
            input.tool_use_id = Some(id.to_string());
        }

        let mut merged_output: Option<Value> = None;

        for hook in hooks {
            match hook.run(&input).await {
                Ok(outcome) if outcome.is_blocked() => {
                    warn!(
                        hook = hook.name(),
                        event = %event,
                        reason = outcome.block_reason.as_deref().unwrap_or("(none)"),
                        "Hook blocked execution"
                    );
                    return outcome;
                }
                Ok(outcome) => {
                    debug!(hook = hook.name(), event = %event, "Hook completed");
                    if let Some(output) = outcome.output {
                        merged_output = Some(merge_output(merged_output.take(), output));
                    }
                }
                Err(error) => {
                    // Fail-open: an observability hook must not take down the
                    // primary execution path
                    warn!(
                        hook = hook.name(),
                        event = %event,
                        error = %error,
                        "Hook failed; continuing"
                    );
                }
            }
        }

        match merged_output {
            Some(output) => HookOutcome::proceed_with(output),
            None => HookOutcome::proceed(),
        }
    }
}

/// Merge hook outputs: objects merge key-wise (later hooks win on
/// conflicts), anything else replaces the accumulated value
fn merge_output(current: Option<Value>, incoming: Value) -> Value {
    match (current, incoming) {
        (Some(Value::Object(mut base)), Value::Object(extra)) => {
            for (key, value) in extra {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, incoming) => incoming,
    }
}
