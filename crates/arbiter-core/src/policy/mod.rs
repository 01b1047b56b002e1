//! Permission policy engine for tool-use governance
//!
//! Every tool invocation the runtime wants to perform is evaluated against
//! an ordered set of policies before execution may proceed. Policies are
//! independent rule units sharing one interface; the engine owns ordering
//! and short-circuit semantics.

pub mod command;
pub mod engine;
pub mod file_access;
pub mod network;
pub mod tool_list;

pub use command::CommandPatternPolicy;
pub use engine::PermissionPolicyEngine;
pub use file_access::FileAccessPolicy;
pub use network::DomainPolicy;
pub use tool_list::{ToolAllowlistPolicy, ToolDenylistPolicy};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::error::ArbiterResult;

/// Lifecycle context shared by policies and hooks for one invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolContext {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl ToolContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: None,
            working_dir: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// One tool invocation awaiting a governance decision
///
/// Transient: created per tool-use event and dropped once the decision is
/// recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    pub tool_name: String,
    pub tool_use_id: String,
    pub input: Value,
    pub context: ToolContext,
}

impl ToolInvocationRequest {
    pub fn new(
        tool_name: impl Into<String>,
        tool_use_id: impl Into<String>,
        input: Value,
        context: ToolContext,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_use_id: tool_use_id.into(),
            input,
            context,
        }
    }

    /// String field from the structured input, if present
    pub fn input_str(&self, field: &str) -> Option<&str> {
        self.input.get(field).and_then(Value::as_str)
    }
}

/// Decision produced by policy evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    Allow,
    Deny { reason: String },
}

impl PolicyDecision {
    pub fn allow() -> Self {
        Self::Allow
    }

    /// Deny with the mandatory reason
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn deny_reason(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Deny { reason } => Some(reason),
        }
    }
}

/// A rule unit that allows or denies a tool invocation before it executes
pub trait ToolPolicy: Send + Sync {
    /// Stable name for logging and diagnostics
    fn name(&self) -> &str;

    /// Whether this policy has an opinion about the given tool
    fn applicable_to(&self, tool_name: &str) -> bool;

    /// Evaluate the invocation
    ///
    /// An `Err` means the policy itself failed; the engine logs and skips it
    /// rather than halting governance.
    fn evaluate(&self, request: &ToolInvocationRequest) -> ArbiterResult<PolicyDecision>;
}
