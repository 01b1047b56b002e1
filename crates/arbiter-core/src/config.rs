//! Per-session runtime configuration
//!
//! A [`RuntimeConfig`] is derived from the session record once, validated at
//! construction, and immutable for the lifetime of the executor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ArbiterError, ArbiterResult};
use crate::recovery::retry::RetryPolicy;
use crate::session::{Session, SessionMode};

/// Immutable configuration for one runtime client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Model identifier forwarded to the runtime
    pub model: String,
    /// Permission mode forwarded to the runtime
    pub permission_mode: String,
    /// Maximum conversation turns per query
    pub max_turns: u32,
    /// Retry budget for background executions
    pub max_retries: u32,
    /// Base delay between retries
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    /// Hard timeout for runtime calls, enforced at the client boundary
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Whether partial-message streaming is requested
    pub streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Tools the runtime may offer to the agent
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    /// MCP servers the runtime should attach
    #[serde(default)]
    pub mcp_servers: Vec<String>,
}

impl RuntimeConfig {
    /// Build a validated configuration from a session record
    ///
    /// Streaming is a property of the execution strategy: interactive and
    /// forked sessions stream partial messages, background sessions do not.
    pub fn from_session(session: &Session) -> ArbiterResult<Self> {
        let config = Self {
            model: session.model.clone(),
            permission_mode: session.permission_mode.clone(),
            max_turns: session.max_turns,
            max_retries: session.max_retries,
            retry_delay: session.retry_delay,
            timeout: session.timeout,
            streaming: !matches!(session.mode, SessionMode::Background),
            working_dir: session.working_dir.clone(),
            allowed_tools: session.allowed_tools.clone(),
            mcp_servers: Vec::new(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration invariants
    pub fn validate(&self) -> ArbiterResult<()> {
        if self.model.trim().is_empty() {
            return Err(ArbiterError::config("model must not be empty"));
        }
        if self.permission_mode.trim().is_empty() {
            return Err(ArbiterError::config("permission mode must not be empty"));
        }
        if self.max_turns == 0 {
            return Err(ArbiterError::config("max turns must be greater than zero"));
        }
        if self.retry_delay.is_zero() {
            return Err(ArbiterError::config("retry delay must be greater than zero"));
        }
        if self.timeout.is_zero() {
            return Err(ArbiterError::config("timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Set the MCP server list
    pub fn with_mcp_servers(mut self, servers: Vec<String>) -> Self {
        self.mcp_servers = servers;
        self
    }

    /// Enable or disable partial-message streaming
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Derive the retry policy for this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(self.max_retries)
            .with_base_delay(self.retry_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionMode;

    fn base_session() -> Session {
        Session::new("s-1", SessionMode::Interactive, "sonnet")
    }

    #[test]
    fn test_from_session_valid() {
        let config = RuntimeConfig::from_session(&base_session()).unwrap();
        assert_eq!(config.model, "sonnet");
        assert!(config.streaming);
    }

    #[test]
    fn test_background_disables_streaming() {
        let session = Session::new("s-1", SessionMode::Background, "sonnet");
        let config = RuntimeConfig::from_session(&session).unwrap();
        assert!(!config.streaming);
    }

    #[test]
    fn test_empty_model_rejected() {
        let session = Session::new("s-1", SessionMode::Interactive, "  ");
        let err = RuntimeConfig::from_session(&session).unwrap_err();
        assert!(matches!(err, ArbiterError::Config(_)));
    }

    #[test]
    fn test_empty_permission_mode_rejected() {
        let session = base_session().with_permission_mode("");
        let err = RuntimeConfig::from_session(&session).unwrap_err();
        assert!(matches!(err, ArbiterError::Config(_)));
    }

    #[test]
    fn test_zero_max_turns_rejected() {
        let session = base_session().with_max_turns(0);
        assert!(RuntimeConfig::from_session(&session).is_err());
    }

    #[test]
    fn test_zero_delay_rejected() {
        let session = base_session().with_retry_delay(Duration::ZERO);
        assert!(RuntimeConfig::from_session(&session).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let session = base_session().with_timeout(Duration::ZERO);
        assert!(RuntimeConfig::from_session(&session).is_err());
    }

    #[test]
    fn test_retry_policy_derivation() {
        let session = base_session()
            .with_max_retries(5)
            .with_retry_delay(Duration::from_millis(200));
        let config = RuntimeConfig::from_session(&session).unwrap();
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(200));
    }
}
