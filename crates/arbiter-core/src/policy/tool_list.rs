//! Tool allow-list and deny-list policies

use std::collections::HashSet;

use crate::error::ArbiterResult;

use super::{PolicyDecision, ToolInvocationRequest, ToolPolicy};

/// Allows only the listed tools; an empty list means unrestricted
#[derive(Debug, Clone)]
pub struct ToolAllowlistPolicy {
    allowed: HashSet<String>,
}

impl ToolAllowlistPolicy {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

impl ToolPolicy for ToolAllowlistPolicy {
    fn name(&self) -> &str {
        "tool_allowlist"
    }

    fn applicable_to(&self, _tool_name: &str) -> bool {
        !self.allowed.is_empty()
    }

    fn evaluate(&self, request: &ToolInvocationRequest) -> ArbiterResult<PolicyDecision> {
        if self.allowed.contains(&request.tool_name) {
            Ok(PolicyDecision::allow())
        } else {
            Ok(PolicyDecision::deny(format!(
                "tool {} is not in the session allow-list",
                request.tool_name
            )))
        }
    }
}

/// Denies the listed tools unconditionally
#[derive(Debug, Clone)]
pub struct ToolDenylistPolicy {
    denied: HashSet<String>,
}

impl ToolDenylistPolicy {
    pub fn new<I, S>(denied: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            denied: denied.into_iter().map(Into::into).collect(),
        }
    }
}

impl ToolPolicy for ToolDenylistPolicy {
    fn name(&self) -> &str {
        "tool_denylist"
    }

    fn applicable_to(&self, tool_name: &str) -> bool {
        self.denied.contains(tool_name)
    }

    fn evaluate(&self, request: &ToolInvocationRequest) -> ArbiterResult<PolicyDecision> {
        Ok(PolicyDecision::deny(format!(
            "tool {} is denied for this session",
            request.tool_name
        )))
    }
}
