//! Execution failure handling

use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::error::ArbiterError;
use crate::metrics::{MetricsSnapshot, SharedMetrics};
use crate::session::SessionStatus;
use crate::store::{AuditLog, MetricsStore, SessionStore};

/// Marks the session failed, audits the failure, and snapshots the
/// best-available metrics
///
/// Every step is best-effort: error handling must not itself fail, so
/// collaborator errors are logged and the snapshot is still returned.
pub struct ErrorHandler {
    metrics: SharedMetrics,
    metrics_store: Arc<dyn MetricsStore>,
    sessions: Arc<dyn SessionStore>,
    audit: Arc<dyn AuditLog>,
    session_id: String,
}

impl ErrorHandler {
    pub fn new(
        metrics: SharedMetrics,
        metrics_store: Arc<dyn MetricsStore>,
        sessions: Arc<dyn SessionStore>,
        audit: Arc<dyn AuditLog>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            metrics,
            metrics_store,
            sessions,
            audit,
            session_id: session_id.into(),
        }
    }

    /// Handle a terminal execution error; returns the metrics snapshot
    pub async fn handle(&self, error: &ArbiterError) -> MetricsSnapshot {
        let status = if matches!(error, ArbiterError::Cancelled) {
            SessionStatus::Cancelled
        } else {
            SessionStatus::Failed
        };

        let snapshot = {
            let mut metrics = self.metrics.lock();
            metrics.record_error();
            metrics.snapshot()
        };

        if let Err(store_error) = self
            .sessions
            .update_status(&self.session_id, status, Some(error.to_string()))
            .await
        {
            warn!(
                session = %self.session_id,
                error = %store_error,
                "Failed to mark session status"
            );
        }

        if let Err(audit_error) = self
            .audit
            .record(
                "execution_failed",
                "execution",
                &self.session_id,
                json!({
                    "error": error.to_string(),
                    "status": status.as_str(),
                }),
            )
            .await
        {
            warn!(
                session = %self.session_id,
                error = %audit_error,
                "Failed to audit execution failure"
            );
        }

        if let Err(store_error) = self
            .metrics_store
            .snapshot(&self.session_id, &snapshot)
            .await
        {
            warn!(
                session = %self.session_id,
                error = %store_error,
                "Failed to persist metrics snapshot"
            );
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::RuntimeMetrics;
    use crate::store::{MockAuditLog, MockMetricsStore, MockSessionStore};
    use mockall::predicate::eq;

    #[tokio::test]
    async fn marks_failed_and_audits() {
        let mut sessions = MockSessionStore::new();
        sessions
            .expect_update_status()
            .withf(|id, status, message| {
                id == "s-1"
                    && *status == SessionStatus::Failed
                    && message.as_deref().unwrap_or_default().contains("refused")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut audit = MockAuditLog::new();
        audit
            .expect_record()
            .with(
                eq("execution_failed"),
                eq("execution"),
                eq("s-1"),
                mockall::predicate::always(),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let mut metrics_store = MockMetricsStore::new();
        metrics_store
            .expect_snapshot()
            .times(1)
            .returning(|_, _| Ok(()));

        let handler = ErrorHandler::new(
            RuntimeMetrics::shared("s-1"),
            Arc::new(metrics_store),
            Arc::new(sessions),
            Arc::new(audit),
            "s-1",
        );

        let snapshot = handler
            .handle(&ArbiterError::connection("connection refused"))
            .await;
        assert_eq!(snapshot.error_count, 1);
    }

    #[tokio::test]
    async fn cancellation_marks_cancelled() {
        let mut sessions = MockSessionStore::new();
        sessions
            .expect_update_status()
            .withf(|_, status, _| *status == SessionStatus::Cancelled)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut audit = MockAuditLog::new();
        audit.expect_record().returning(|_, _, _, _| Ok(()));
        let mut metrics_store = MockMetricsStore::new();
        metrics_store.expect_snapshot().returning(|_, _| Ok(()));

        let handler = ErrorHandler::new(
            RuntimeMetrics::shared("s-1"),
            Arc::new(metrics_store),
            Arc::new(sessions),
            Arc::new(audit),
            "s-1",
        );
        handler.handle(&ArbiterError::Cancelled).await;
    }

    #[tokio::test]
    async fn collaborator_failures_never_propagate() {
        let mut sessions = MockSessionStore::new();
        sessions
            .expect_update_status()
            .returning(|_, _, _| Err(ArbiterError::storage("down")));
        let mut audit = MockAuditLog::new();
        audit
            .expect_record()
            .returning(|_, _, _, _| Err(ArbiterError::storage("down")));
        let mut metrics_store = MockMetricsStore::new();
        metrics_store
            .expect_snapshot()
            .returning(|_, _| Err(ArbiterError::storage("down")));

        let handler = ErrorHandler::new(
            RuntimeMetrics::shared("s-1"),
            Arc::new(metrics_store),
            Arc::new(sessions),
            Arc::new(audit),
            "s-1",
        );
        // Must complete and still hand back a snapshot
        let snapshot = handler.handle(&ArbiterError::protocol("bad frame")).await;
        assert_eq!(snapshot.session_id, "s-1");
    }
}
