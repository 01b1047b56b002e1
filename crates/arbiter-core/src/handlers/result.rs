//! Terminal result handling

use std::sync::Arc;

use crate::error::ArbiterResult;
use crate::metrics::{MetricsSnapshot, SharedMetrics};
use crate::runtime::events::ResultEvent;
use crate::session::SessionStatus;
use crate::store::{MetricsStore, SessionStore};

/// Finalizes metrics on the terminal runtime event and persists the snapshot
///
/// Finalization is deduplicated by event identity, so replaying the same
/// terminal event produces the same snapshot.
pub struct ResultHandler {
    metrics: SharedMetrics,
    metrics_store: Arc<dyn MetricsStore>,
    sessions: Arc<dyn SessionStore>,
    session_id: String,
}

impl ResultHandler {
    pub fn new(
        metrics: SharedMetrics,
        metrics_store: Arc<dyn MetricsStore>,
        sessions: Arc<dyn SessionStore>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            metrics,
            metrics_store,
            sessions,
            session_id: session_id.into(),
        }
    }

    /// Handle the terminal event; returns the final snapshot
    pub async fn handle(&self, event: &ResultEvent) -> ArbiterResult<MetricsSnapshot> {
        let snapshot = {
            let mut metrics = self.metrics.lock();
            metrics.finalize(event);
            metrics.snapshot()
        };

        self.metrics_store
            .snapshot(&self.session_id, &snapshot)
            .await?;

        let (status, error_message) = if event.is_error {
            (SessionStatus::Failed, event.result.clone())
        } else {
            (SessionStatus::Completed, None)
        };
        self.sessions
            .update_status(&self.session_id, status, error_message)
            .await?;

        Ok(snapshot)
    }
}
