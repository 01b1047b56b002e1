//! Ordered policy evaluation

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{PolicyDecision, ToolInvocationRequest, ToolPolicy};

struct RegisteredPolicy {
    priority: i32,
    /// Registration order, used to keep equal priorities stable
    seq: usize,
    policy: Arc<dyn ToolPolicy>,
}

/// Holds an ordered set of policies and evaluates invocations against them
///
/// Policies run ascending by priority (lower number first); the first deny
/// short-circuits. A policy whose evaluation fails is skipped so a single
/// buggy policy cannot halt governance for all tools.
#[derive(Clone, Default)]
pub struct PermissionPolicyEngine {
    policies: Arc<RwLock<Vec<RegisteredPolicy>>>,
}

impl PermissionPolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy at the given priority
    pub fn register(&self, policy: Arc<dyn ToolPolicy>, priority: i32) {
        let mut policies = self.policies.write();
        let seq = policies.len();
        policies.push(RegisteredPolicy {
            priority,
            seq,
            policy,
        });
        policies.sort_by_key(|p| (p.priority, p.seq));
    }

    /// Evaluate a tool invocation against all applicable policies
    pub fn evaluate(&self, request: &ToolInvocationRequest) -> PolicyDecision {
        let policies = self.policies.read();
        for registered in policies.iter() {
            if !registered.policy.applicable_to(&request.tool_name) {
                continue;
            }
            match registered.policy.evaluate(request) {
                Ok(PolicyDecision::Allow) => {}
                Ok(decision @ PolicyDecision::Deny { .. }) => {
                    debug!(
                        policy = registered.policy.name(),
                        tool = %request.tool_name,
                        tool_use_id = %request.tool_use_id,
                        reason = decision.deny_reason().unwrap_or_default(),
                        "Tool invocation denied"
                    );
                    return decision;
                }
                Err(error) => {
                    // Fail-open per policy: a broken rule has no opinion
                    warn!(
                        policy = registered.policy.name(),
                        tool = %request.tool_name,
                        error = %error,
                        "Policy evaluation failed; skipping policy"
                    );
                }
            }
        }
        PolicyDecision::Allow
    }

    /// Number of registered policies
    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.read().is_empty()
    }

    /// Names of registered policies in evaluation order
    pub fn policy_names(&self) -> Vec<String> {
        self.policies
            .read()
            .iter()
            .map(|p| p.policy.name().to_string())
            .collect()
    }
}
