//! Audit hook

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::types::{HookInput, HookOutcome, LifecycleHook};
use crate::error::ArbiterResult;
use crate::store::AuditLog;

/// Priority the factory registers the audit hook at, ahead of all others
pub const AUDIT_HOOK_PRIORITY: i32 = -100;

/// Records every lifecycle event through the audit log
///
/// Registered first so the attempt is on record before any other hook can
/// block it. Never blocks; a failing audit backend is handled fail-open by
/// the pipeline.
pub struct AuditHook {
    audit: Arc<dyn AuditLog>,
}

impl AuditHook {
    pub fn new(audit: Arc<dyn AuditLog>) -> Self {
        Self { audit }
    }
}

#[async_trait]
impl LifecycleHook for AuditHook {
    fn name(&self) -> &str {
        "audit"
    }

    async fn run(&self, input: &HookInput) -> ArbiterResult<HookOutcome> {
        self.audit
            .record(
                input.event.as_str(),
                "tool_lifecycle",
                &input.context.session_id,
                json!({
                    "tool_name": input.tool_name,
                    "tool_use_id": input.tool_use_id,
                    "data": input.data,
                }),
            )
            .await?;
        Ok(HookOutcome::proceed())
    }
}
