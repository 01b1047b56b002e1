//! Command-pattern blocklist policy

use std::collections::HashSet;

use crate::error::ArbiterResult;

use super::{PolicyDecision, ToolInvocationRequest, ToolPolicy};

/// Denies shell-class tool invocations whose command matches a blocklist
///
/// Matching is plain substring search against the `command` input field.
#[derive(Debug, Clone)]
pub struct CommandPatternPolicy {
    blocked_patterns: Vec<String>,
    command_tools: HashSet<String>,
}

impl CommandPatternPolicy {
    pub fn new(blocked_patterns: Vec<String>) -> Self {
        Self {
            blocked_patterns,
            command_tools: ["bash", "shell", "run_command"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Blocklist covering the usual destructive shell idioms
    pub fn with_default_blocklist() -> Self {
        Self::new(
            [
                "rm -rf /",
                "mkfs",
                "dd if=",
                ":(){ :|:& };:",
                "> /dev/sda",
                "chmod -R 777 /",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        )
    }

    /// Override the tool names treated as command runners
    pub fn with_command_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command_tools = tools.into_iter().map(Into::into).collect();
        self
    }
}

impl ToolPolicy for CommandPatternPolicy {
    fn name(&self) -> &str {
        "command_pattern"
    }

    fn applicable_to(&self, tool_name: &str) -> bool {
        self.command_tools.contains(tool_name)
    }

    fn evaluate(&self, request: &ToolInvocationRequest) -> ArbiterResult<PolicyDecision> {
        let Some(command) = request.input_str("command") else {
            return Ok(PolicyDecision::allow());
        };

        for pattern in &self.blocked_patterns {
            if command.contains(pattern.as_str()) {
                return Ok(PolicyDecision::deny(format!(
                    "command matches blocked pattern: {pattern}"
                )));
            }
        }
        Ok(PolicyDecision::allow())
    }
}
