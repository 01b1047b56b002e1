//! Tool input validation hook

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use super::events::HookEvent;
use super::types::{HookInput, HookOutcome, LifecycleHook};
use crate::error::{ArbiterError, ArbiterResult};

/// Priority the factory registers the validation hook at
pub const VALIDATION_HOOK_PRIORITY: i32 = 0;

/// Expected JSON type of a tool input field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }
}

/// Validation rules for one tool's input
#[derive(Debug, Clone, Default)]
pub struct ToolValidationRule {
    required_fields: Vec<String>,
    field_types: HashMap<String, FieldType>,
    patterns: HashMap<String, Regex>,
}

impl ToolValidationRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a field to be present
    pub fn with_required(mut self, field: impl Into<String>) -> Self {
        self.required_fields.push(field.into());
        self
    }

    /// Require a field, when present, to have the given type
    pub fn with_type(mut self, field: impl Into<String>, field_type: FieldType) -> Self {
        self.field_types.insert(field.into(), field_type);
        self
    }

    /// Require a string field, when present, to match the pattern
    pub fn with_pattern(mut self, field: impl Into<String>, pattern: &str) -> ArbiterResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| ArbiterError::config(format!("invalid validation pattern: {e}")))?;
        self.patterns.insert(field.into(), regex);
        Ok(self)
    }

    /// First violation in the input, if any
    fn check(&self, input: &Value) -> Option<String> {
        for field in &self.required_fields {
            if input.get(field).is_none() {
                return Some(format!("missing required field: {field}"));
            }
        }

        for (field, expected) in &self.field_types {
            if let Some(value) = input.get(field) {
                if !expected.matches(value) {
                    return Some(format!(
                        "field {field} must be of type {}",
                        expected.as_str()
                    ));
                }
            }
        }

        for (field, regex) in &self.patterns {
            if let Some(value) = input.get(field).and_then(Value::as_str) {
                if !regex.is_match(value) {
                    return Some(format!("field {field} does not match pattern {regex}"));
                }
            }
        }

        None
    }
}

/// Schema-checks tool input against per-tool rules, denying on the first
/// violation
///
/// This is the policy/validation-style hook whose explicit block must
/// propagate through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ValidationHook {
    rules: HashMap<String, ToolValidationRule>,
}

impl ValidationHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a rule for a tool
    pub fn with_rule(mut self, tool_name: impl Into<String>, rule: ToolValidationRule) -> Self {
        self.rules.insert(tool_name.into(), rule);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl LifecycleHook for ValidationHook {
    fn name(&self) -> &str {
        "validation"
    }

    async fn run(&self, input: &HookInput) -> ArbiterResult<HookOutcome> {
        if input.event != HookEvent::PreToolUse {
            return Ok(HookOutcome::proceed());
        }
        let Some(rule) = input.tool_name.as_deref().and_then(|t| self.rules.get(t)) else {
            return Ok(HookOutcome::proceed());
        };

        match rule.check(&input.data) {
            Some(violation) => Ok(HookOutcome::block(format!(
                "tool input validation failed: {violation}"
            ))),
            None => Ok(HookOutcome::proceed()),
        }
    }
}
