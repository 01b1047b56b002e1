//! Session value types consumed by the engine
//!
//! Sessions are owned by the persistence layer; the engine only reads them
//! to select an execution strategy and build the runtime configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::error::ArbiterError;

/// Execution strategy discriminator carried by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Streaming execution with partial-message broadcasting
    Interactive,
    /// Batch execution wrapped in retry protection
    Background,
    /// Continuation of a parent session's conversation
    Forked,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Interactive => "interactive",
            SessionMode::Background => "background",
            SessionMode::Forked => "forked",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionMode {
    type Err = ArbiterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interactive" => Ok(SessionMode::Interactive),
            "background" => Ok(SessionMode::Background),
            "forked" => Ok(SessionMode::Forked),
            other => Err(ArbiterError::unknown_mode(other)),
        }
    }
}

/// Terminal and in-flight statuses reported to the session store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    /// Whether this status ends the session lifecycle
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only session record
///
/// Built by the caller from the persisted session row. The engine derives a
/// [`crate::config::RuntimeConfig`] from it and otherwise treats it as
/// immutable input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub mode: SessionMode,
    pub model: String,
    pub permission_mode: String,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    pub max_turns: u32,
    pub max_retries: u32,
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,
    /// Message id marking where a fork diverges from the parent conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_point: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with engine defaults for the tuning knobs
    pub fn new(id: impl Into<String>, mode: SessionMode, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mode,
            model: model.into(),
            permission_mode: "default".to_string(),
            allowed_tools: Vec::new(),
            working_dir: None,
            max_turns: 20,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
            parent_session_id: None,
            fork_point: None,
            user_id: None,
            created_at: Utc::now(),
        }
    }

    /// Set the permission mode
    pub fn with_permission_mode(mut self, mode: impl Into<String>) -> Self {
        self.permission_mode = mode.into();
        self
    }

    /// Set the tool allow-list
    pub fn with_allowed_tools(mut self, tools: Vec<String>) -> Self {
        self.allowed_tools = tools;
        self
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the maximum number of conversation turns
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Set the retry budget for background executions
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base retry delay
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the runtime call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the parent session for forked executions
    pub fn with_parent(mut self, parent_id: impl Into<String>, fork_point: Option<Uuid>) -> Self {
        self.parent_session_id = Some(parent_id.into());
        self.fork_point = fork_point;
        self
    }

    /// Set the owning user
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}
