//! Hook pipeline for tool lifecycle events
//!
//! Hooks are independent units keyed by a lifecycle event type and run
//! sequentially in priority order. A hook can observe, emit structured
//! output, or block continuation; a hook that fails is treated as having no
//! opinion so observability hooks never take down primary execution.

pub mod audit;
pub mod events;
pub mod metrics;
pub mod notification;
pub mod pipeline;
pub mod registry;
pub mod types;
pub mod validation;

pub use audit::AuditHook;
pub use events::HookEvent;
pub use metrics::{MetricsHook, ToolCounters};
pub use notification::NotificationHook;
pub use pipeline::HookPipeline;
pub use registry::HookRegistry;
pub use types::{HookInput, HookOutcome, LifecycleHook};
pub use validation::{FieldType, ToolValidationRule, ValidationHook};
