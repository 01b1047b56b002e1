//! Per-session runtime metrics
//!
//! A [`RuntimeMetrics`] instance is created with its runtime client and lives
//! exactly as long as the session's execution. All mutation goes through the
//! `record_*`/`add_*` methods; finalization is keyed by the terminal event's
//! identity so replays never double count.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::runtime::events::ResultEvent;

/// Shared handle to the metrics owned by one runtime client
pub type SharedMetrics = Arc<Mutex<RuntimeMetrics>>;

/// Token accounting reported by the runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
}

impl TokenUsage {
    /// Accumulate another usage report into this one
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_creation_tokens += other.cache_creation_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
    }

    /// Total tokens across all categories
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_creation_tokens + self.cache_read_tokens
    }
}

/// Mutable counters for one session execution
#[derive(Debug, Clone)]
pub struct RuntimeMetrics {
    session_id: String,
    message_count: u64,
    tool_call_count: u64,
    error_count: u64,
    retry_count: u64,
    usage: TokenUsage,
    total_cost_usd: f64,
    num_turns: Option<u32>,
    duration_ms: Option<u64>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    /// Identity of the terminal event this instance was finalized with
    finalized_by: Option<Uuid>,
}

impl RuntimeMetrics {
    /// Create fresh metrics for a session
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message_count: 0,
            tool_call_count: 0,
            error_count: 0,
            retry_count: 0,
            usage: TokenUsage::default(),
            total_cost_usd: 0.0,
            num_turns: None,
            duration_ms: None,
            started_at: Utc::now(),
            completed_at: None,
            finalized_by: None,
        }
    }

    /// Create a shared handle around fresh metrics
    pub fn shared(session_id: impl Into<String>) -> SharedMetrics {
        Arc::new(Mutex::new(Self::new(session_id)))
    }

    pub fn record_message(&mut self) {
        self.message_count += 1;
    }

    pub fn record_tool_call(&mut self) {
        self.tool_call_count += 1;
    }

    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    pub fn record_retry(&mut self) {
        self.retry_count += 1;
    }

    pub fn add_usage(&mut self, usage: &TokenUsage) {
        self.usage.add(usage);
    }

    pub fn add_cost(&mut self, cost_usd: f64) {
        self.total_cost_usd += cost_usd;
    }

    /// Finalize metrics with a terminal runtime event
    ///
    /// Idempotent per event identity: replaying the event that already
    /// finalized this instance is a no-op, and a conflicting second terminal
    /// event is rejected with a warning. Returns whether this call applied.
    pub fn finalize(&mut self, event: &ResultEvent) -> bool {
        match self.finalized_by {
            Some(id) if id == event.id => {
                debug!(session = %self.session_id, event = %id, "Duplicate terminal event ignored");
                false
            }
            Some(id) => {
                warn!(
                    session = %self.session_id,
                    finalized_by = %id,
                    conflicting = %event.id,
                    "Metrics already finalized by a different terminal event"
                );
                false
            }
            None => {
                self.usage.add(&event.usage);
                self.total_cost_usd += event.total_cost_usd;
                self.num_turns = Some(event.num_turns);
                self.duration_ms = Some(event.duration_ms);
                self.completed_at = Some(Utc::now());
                self.finalized_by = Some(event.id);
                true
            }
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized_by.is_some()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Immutable copy handed to the metrics store
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            session_id: self.session_id.clone(),
            message_count: self.message_count,
            tool_call_count: self.tool_call_count,
            error_count: self.error_count,
            retry_count: self.retry_count,
            usage: self.usage,
            total_cost_usd: self.total_cost_usd,
            num_turns: self.num_turns,
            duration_ms: self.duration_ms,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

/// Point-in-time copy of the counters, safe to persist or return to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub session_id: String,
    pub message_count: u64,
    pub tool_call_count: u64,
    pub error_count: u64,
    pub retry_count: u64,
    pub usage: TokenUsage,
    pub total_cost_usd: f64,
    pub num_turns: Option<u32>,
    pub duration_ms: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
