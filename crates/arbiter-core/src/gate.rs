//! Tool-use gate combining hooks and policies
//!
//! The gate is handed to the runtime connection with every query; the
//! runtime consults it before executing any tool. Evaluation is fully
//! synchronous relative to the invocation: no tool executes before its
//! governing hooks and policies have resolved.

use async_trait::async_trait;
use serde_json::json;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::hooks::{HookEvent, HookPipeline};
use crate::policy::{PermissionPolicyEngine, PolicyDecision, ToolInvocationRequest};
use crate::store::{AuditLog, ToolCallRecord, ToolCallStore};

/// Resolved gate outcome for one invocation
#[derive(Debug, Clone)]
pub struct GateDecision {
    pub decision: PolicyDecision,
    /// Structured output accumulated by the pre-tool-use hooks
    pub hook_output: Option<Value>,
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }
}

/// Permission callback the runtime invokes per tool use
#[async_trait]
pub trait ToolGate: Send + Sync {
    async fn check(&self, request: &ToolInvocationRequest) -> GateDecision;
}

/// Production gate: pre-tool-use hooks first, then the policy engine
///
/// The attempt and its outcome are recorded through the tool-call store and
/// the audit log; recording failures are logged and never influence the
/// decision.
pub struct GovernedToolGate {
    policies: PermissionPolicyEngine,
    hooks: HookPipeline,
    tool_calls: Arc<dyn ToolCallStore>,
    audit: Arc<dyn AuditLog>,
}

impl GovernedToolGate {
    pub fn new(
        policies: PermissionPolicyEngine,
        hooks: HookPipeline,
        tool_calls: Arc<dyn ToolCallStore>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            policies,
            hooks,
            tool_calls,
            audit,
        }
    }

    async fn record(&self, record: &ToolCallRecord) {
        if let Err(error) = self.tool_calls.upsert(record).await {
            warn!(
                tool_use_id = %record.tool_use_id,
                error = %error,
                "Tool-call record upsert failed"
            );
        }
    }

    async fn audit_denial(&self, request: &ToolInvocationRequest, reason: &str) {
        let details = json!({
            "tool_name": request.tool_name,
            "tool_use_id": request.tool_use_id,
            "reason": reason,
        });
        if let Err(error) = self
            .audit
            .record(
                "tool_denied",
                "governance",
                &request.context.session_id,
                details,
            )
            .await
        {
            warn!(error = %error, "Audit record failed");
        }
    }
}

#[async_trait]
impl ToolGate for GovernedToolGate {
    async fn check(&self, request: &ToolInvocationRequest) -> GateDecision {
        let record = ToolCallRecord::pending(
            &request.context.session_id,
            &request.tool_use_id,
            &request.tool_name,
            request.input.clone(),
        );
        self.record(&record).await;

        let hook_outcome = self
            .hooks
            .run(
                HookEvent::PreToolUse,
                request.input.clone(),
                Some(&request.tool_name),
                Some(&request.tool_use_id),
                &request.context,
            )
            .await;

        if hook_outcome.is_blocked() {
            let reason = hook_outcome
                .block_reason
                .unwrap_or_else(|| "blocked by hook".to_string());
            self.record(&record.denied(&reason)).await;
            self.audit_denial(request, &reason).await;
            return GateDecision {
                decision: PolicyDecision::deny(reason),
                hook_output: None,
            };
        }

        let decision = self.policies.evaluate(request);
        match &decision {
            PolicyDecision::Allow => {
                self.record(&record.with_status(crate::store::ToolCallStatus::Approved))
                    .await;
            }
            PolicyDecision::Deny { reason } => {
                self.record(&record.denied(reason)).await;
                self.audit_denial(request, reason).await;
            }
        }

        GateDecision {
            decision,
            hook_output: hook_outcome.output,
        }
    }
}
