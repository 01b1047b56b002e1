//! Per-tool call and error counters

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::events::HookEvent;
use super::types::{HookInput, HookOutcome, LifecycleHook};
use crate::error::ArbiterResult;

/// Priority the factory registers the metrics hook at
pub const METRICS_HOOK_PRIORITY: i32 = -50;

/// Counters maintained per tool name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolCounters {
    pub calls: u64,
    pub errors: u64,
}

/// Counts tool invocations and failures per tool name
///
/// Purely observational; always proceeds.
#[derive(Default)]
pub struct MetricsHook {
    counters: Mutex<HashMap<String, ToolCounters>>,
}

impl MetricsHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the counters collected so far
    pub fn snapshot(&self) -> HashMap<String, ToolCounters> {
        self.counters.lock().clone()
    }
}

#[async_trait]
impl LifecycleHook for MetricsHook {
    fn name(&self) -> &str {
        "metrics"
    }

    async fn run(&self, input: &HookInput) -> ArbiterResult<HookOutcome> {
        let Some(tool_name) = input.tool_name.as_deref() else {
            return Ok(HookOutcome::proceed());
        };

        let mut counters = self.counters.lock();
        let entry = counters.entry(tool_name.to_string()).or_default();
        match input.event {
            HookEvent::PreToolUse => entry.calls += 1,
            HookEvent::PostToolUse => {
                let failed = input
                    .data
                    .get("is_error")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                if failed {
                    entry.errors += 1;
                }
            }
            _ => {}
        }

        Ok(HookOutcome::proceed())
    }
}
