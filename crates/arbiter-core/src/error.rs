//! Error types for the arbiter engine

use thiserror::Error;

/// Result type alias for engine operations
pub type ArbiterResult<T> = Result<T, ArbiterError>;

/// Main error type for the session execution engine
#[derive(Error, Debug, Clone)]
pub enum ArbiterError {
    /// Configuration validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transient connection failures against the agent runtime
    #[error("Runtime connection error: {0}")]
    Connection(String),

    /// Fatal protocol violations from the agent runtime
    #[error("Runtime protocol error: {0}")]
    Protocol(String),

    /// Circuit breaker rejected the attempt
    #[error("Circuit breaker open for component: {component}")]
    CircuitOpen { component: String },

    /// A permission policy failed to evaluate
    #[error("Policy evaluation error: {0}")]
    Policy(String),

    /// A lifecycle hook failed to execute
    #[error("Hook execution error: {0}")]
    Hook(String),

    /// Session state errors
    #[error("Session error: {0}")]
    Session(String),

    /// Persistence collaborator errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Runtime call exceeded the configured timeout
    #[error("Execution timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Execution was cancelled
    #[error("Execution was cancelled")]
    Cancelled,

    /// Session carries a mode the factory does not recognize
    #[error("Unknown session mode: {0}")]
    UnknownMode(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl ArbiterError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a new protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a new circuit-open error
    pub fn circuit_open(component: impl Into<String>) -> Self {
        Self::CircuitOpen {
            component: component.into(),
        }
    }

    /// Create a new policy evaluation error
    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy(message.into())
    }

    /// Create a new hook execution error
    pub fn hook(message: impl Into<String>) -> Self {
        Self::Hook(message.into())
    }

    /// Create a new session error
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a new timeout error
    pub const fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    /// Create a new unknown-mode error
    pub fn unknown_mode(mode: impl Into<String>) -> Self {
        Self::UnknownMode(mode.into())
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<anyhow::Error> for ArbiterError {
    fn from(error: anyhow::Error) -> Self {
        Self::Other(error.to_string())
    }
}

impl From<std::io::Error> for ArbiterError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for ArbiterError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArbiterError::connection("connection refused");
        assert_eq!(
            err.to_string(),
            "Runtime connection error: connection refused"
        );

        let err = ArbiterError::circuit_open("runtime");
        assert_eq!(err.to_string(), "Circuit breaker open for component: runtime");

        let err = ArbiterError::timeout(30);
        assert_eq!(err.to_string(), "Execution timeout after 30 seconds");
    }

    #[test]
    fn test_error_conversions() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(ArbiterError::from(json_err), ArbiterError::Json(_)));

        let any_err = anyhow::anyhow!("boom");
        assert!(matches!(ArbiterError::from(any_err), ArbiterError::Other(_)));
    }
}
