//! Cancellation handle for one execution
//!
//! Interrupt is a first-class operation: the handle is created per
//! execution, honored at the stream-receive and backoff suspension points,
//! and forwarded to the runtime client. Lifecycle is owned by whoever
//! constructed the executor; there is no global interrupt state.

use tokio_util::sync::CancellationToken;

/// Cancellation handle scoped to one execution
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    token: CancellationToken,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// The underlying token, for `select!`-style suspension points
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request cancellation of the execution
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Child token for scoped sub-operations
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}
