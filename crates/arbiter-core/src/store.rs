//! External collaborator interfaces
//!
//! Persistence, audit, and broadcast are owned by the surrounding
//! application; the engine talks to them only through these traits. All
//! implementations are injected at executor construction, never reached
//! through globals.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::error::ArbiterResult;
use crate::metrics::MetricsSnapshot;
use crate::runtime::events::AssistantMessage;
use crate::session::SessionStatus;

/// Message roles persisted by the message store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Immutable message value object handed to the message store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub session_id: String,
    pub role: MessageRole,
    /// Serialized content blocks
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Build a persistable record from an assistant message
    pub fn from_assistant(session_id: &str, message: &AssistantMessage) -> Self {
        Self {
            id: message.id,
            session_id: session_id.to_string(),
            role: MessageRole::Assistant,
            content: serde_json::to_value(&message.content).unwrap_or(Value::Null),
            model: Some(message.model.clone()),
            created_at: Utc::now(),
        }
    }
}

/// Lifecycle of a governed tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    /// Observed, governance not yet resolved
    Pending,
    /// Policies and hooks allowed execution
    Approved,
    /// Governance refused execution
    Denied,
    /// Runtime reported a successful result
    Completed,
    /// Runtime reported a failed result
    Failed,
}

/// Immutable tool-call value object; updates produce new copies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_use_id: String,
    pub session_id: String,
    pub tool_name: String,
    pub input: Value,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny_reason: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ToolCallRecord {
    /// Create a pending record for a freshly observed invocation
    pub fn pending(
        session_id: impl Into<String>,
        tool_use_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: Value,
    ) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            session_id: session_id.into(),
            tool_name: tool_name.into(),
            input,
            status: ToolCallStatus::Pending,
            output: None,
            deny_reason: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Copy with a new status
    pub fn with_status(mut self, status: ToolCallStatus) -> Self {
        self.status = status;
        if matches!(
            status,
            ToolCallStatus::Denied | ToolCallStatus::Completed | ToolCallStatus::Failed
        ) {
            self.finished_at = Some(Utc::now());
        }
        self
    }

    /// Copy with the runtime's result payload
    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Copy marked as denied with the mandatory reason
    pub fn denied(self, reason: impl Into<String>) -> Self {
        let mut record = self.with_status(ToolCallStatus::Denied);
        record.deny_reason = Some(reason.into());
        record
    }
}

/// Append-only message persistence plus the read path fork restoration needs
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, session_id: &str, message: &StoredMessage) -> ArbiterResult<()>;

    /// Messages of a session in insertion order, optionally truncated at a
    /// fork point (exclusive of everything after that message id)
    async fn history(
        &self,
        session_id: &str,
        up_to: Option<Uuid>,
    ) -> ArbiterResult<Vec<StoredMessage>>;
}

/// Upsert-style persistence for tool-call records, keyed by tool-use id
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ToolCallStore: Send + Sync {
    async fn upsert(&self, record: &ToolCallRecord) -> ArbiterResult<()>;
}

/// Sink for metrics snapshots
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn snapshot(&self, session_id: &str, metrics: &MetricsSnapshot) -> ArbiterResult<()>;
}

/// Session status updates
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn update_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        error_message: Option<String>,
    ) -> ArbiterResult<()>;
}

/// Structured audit trail
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(
        &self,
        event_type: &str,
        category: &str,
        session_id: &str,
        details: Value,
    ) -> ArbiterResult<()>;
}

/// Live-subscriber fanout; may fail independently of execution
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn publish(&self, session_id: &str, event_type: &str, payload: Value) -> ArbiterResult<()>;
}
