//! Partial-update forwarding

use std::sync::Arc;
use tracing::warn;

use crate::runtime::events::StreamEvent;
use crate::store::Broadcaster;

/// Forwards stream events to live subscribers
///
/// Best-effort by contract: publish failures are logged, never propagated.
pub struct StreamHandler {
    broadcaster: Arc<dyn Broadcaster>,
    session_id: String,
}

impl StreamHandler {
    pub fn new(broadcaster: Arc<dyn Broadcaster>, session_id: impl Into<String>) -> Self {
        Self {
            broadcaster,
            session_id: session_id.into(),
        }
    }

    /// Forward one partial update
    pub async fn handle(&self, event: &StreamEvent) {
        if let Err(error) = self
            .broadcaster
            .publish(&self.session_id, "stream", event.payload.clone())
            .await
        {
            warn!(
                session = %self.session_id,
                error = %error,
                "Partial-update broadcast failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArbiterError;
    use crate::store::MockBroadcaster;
    use mockall::predicate::eq;
    use serde_json::json;

    #[test]
    fn forwards_payload() {
        let mut broadcaster = MockBroadcaster::new();
        broadcaster
            .expect_publish()
            .with(eq("s-1"), eq("stream"), eq(json!({"delta": "h"})))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let handler = StreamHandler::new(Arc::new(broadcaster), "s-1");
        tokio_test::block_on(handler.handle(&StreamEvent {
            payload: json!({"delta": "h"}),
        }));
    }

    #[test]
    fn publish_failure_is_swallowed() {
        let mut broadcaster = MockBroadcaster::new();
        broadcaster
            .expect_publish()
            .returning(|_, _, _| Err(ArbiterError::other("gone")));

        let handler = StreamHandler::new(Arc::new(broadcaster), "s-1");
        tokio_test::block_on(handler.handle(&StreamEvent { payload: json!({}) }));
    }
}
