//! Hook registry with per-event priority ordering

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::events::HookEvent;
use super::types::LifecycleHook;

struct RegisteredHook {
    priority: i32,
    /// Registration order, used to keep equal priorities stable
    seq: usize,
    hook: Arc<dyn LifecycleHook>,
}

/// Registry of hooks organized by lifecycle event
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Arc<RwLock<HashMap<HookEvent, Vec<RegisteredHook>>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for an event at the given priority (lower runs first)
    pub fn register(&self, event: HookEvent, hook: Arc<dyn LifecycleHook>, priority: i32) {
        let mut hooks = self.hooks.write();
        let list = hooks.entry(event).or_default();
        let seq = list.len();
        list.push(RegisteredHook {
            priority,
            seq,
            hook,
        });
        list.sort_by_key(|h| (h.priority, h.seq));
    }

    /// Hooks for an event in execution order
    pub fn hooks_for(&self, event: HookEvent) -> Vec<Arc<dyn LifecycleHook>> {
        self.hooks
            .read()
            .get(&event)
            .map(|list| list.iter().map(|h| h.hook.clone()).collect())
            .unwrap_or_default()
    }

    /// Whether any hooks are registered for an event
    pub fn has_hooks(&self, event: HookEvent) -> bool {
        self.hooks
            .read()
            .get(&event)
            .map(|list| !list.is_empty())
            .unwrap_or(false)
    }

    /// Total number of registered hooks
    pub fn count(&self) -> usize {
        self.hooks.read().values().map(Vec::len).sum()
    }

    /// Events with at least one hook
    pub fn events(&self) -> Vec<HookEvent> {
        self.hooks
            .read()
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(event, _)| *event)
            .collect()
    }
}
