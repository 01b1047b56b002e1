//! Executor construction and wiring

use std::path::PathBuf;
use std::sync::Arc;

use super::{
    BackgroundExecutor, ExecutorCore, ForkedExecutor, InteractiveExecutor, SessionExecutor,
};
use crate::config::RuntimeConfig;
use crate::error::{ArbiterError, ArbiterResult};
use crate::gate::GovernedToolGate;
use crate::handlers::{ErrorHandler, MessageHandler, ResultHandler, StreamHandler};
use crate::hooks::{
    audit::AUDIT_HOOK_PRIORITY, metrics::METRICS_HOOK_PRIORITY,
    notification::NOTIFICATION_HOOK_PRIORITY, validation::VALIDATION_HOOK_PRIORITY, AuditHook,
    HookEvent, HookPipeline, HookRegistry, MetricsHook, NotificationHook, ValidationHook,
};
use crate::interrupt::InterruptHandle;
use crate::policy::{
    CommandPatternPolicy, DomainPolicy, FileAccessPolicy, PermissionPolicyEngine,
    ToolAllowlistPolicy, ToolContext, ToolDenylistPolicy,
};
use crate::recovery::{CircuitBreaker, RetryManager};
use crate::runtime::{RuntimeClient, RuntimeConnection};
use crate::session::{Session, SessionMode};
use crate::store::{
    AuditLog, Broadcaster, MessageStore, MetricsStore, SessionStore, ToolCallStore,
};

/// External collaborators injected into every executor
///
/// Lifecycle of each collaborator is owned by the caller; the engine only
/// holds references.
#[derive(Clone)]
pub struct EngineCollaborators {
    pub connection: Arc<dyn RuntimeConnection>,
    pub messages: Arc<dyn MessageStore>,
    pub tool_calls: Arc<dyn ToolCallStore>,
    pub metrics: Arc<dyn MetricsStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub audit: Arc<dyn AuditLog>,
    pub broadcaster: Option<Arc<dyn Broadcaster>>,
}

/// Governance configuration applied to every session the factory wires
#[derive(Clone)]
pub struct EnginePolicyConfig {
    /// Paths read-class tools may never touch
    pub restricted_read_paths: Vec<PathBuf>,
    /// Trees write-class tools are confined to; empty means unrestricted
    pub allowed_write_paths: Vec<PathBuf>,
    /// Substring blocklist for shell-class tools
    pub blocked_command_patterns: Vec<String>,
    /// Domain allow-list for network-class tools; empty means unrestricted
    pub allowed_domains: Vec<String>,
    /// Domain deny-list for network-class tools
    pub blocked_domains: Vec<String>,
    /// Tools denied regardless of the session allow-list
    pub denied_tools: Vec<String>,
    /// Per-tool input validation rules
    pub validation: ValidationHook,
}

impl Default for EnginePolicyConfig {
    fn default() -> Self {
        Self {
            restricted_read_paths: ["/etc/passwd", "/etc/shadow", "/etc/sudoers"]
                .iter()
                .map(PathBuf::from)
                .collect(),
            allowed_write_paths: Vec::new(),
            blocked_command_patterns: [
                "rm -rf /",
                "mkfs",
                "dd if=",
                ":(){ :|:& };:",
                "> /dev/sda",
                "chmod -R 777 /",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            allowed_domains: Vec::new(),
            blocked_domains: Vec::new(),
            denied_tools: Vec::new(),
            validation: ValidationHook::new(),
        }
    }
}

/// Evaluation order of the factory-wired policies
mod priority {
    pub const TOOL_DENYLIST: i32 = -10;
    pub const TOOL_ALLOWLIST: i32 = 0;
    pub const FILE_ACCESS: i32 = 10;
    pub const COMMAND_PATTERN: i32 = 20;
    pub const DOMAIN: i32 = 30;
}

/// Composes a fully-wired executor for a session
pub struct ExecutorFactory {
    collaborators: EngineCollaborators,
    policy_config: EnginePolicyConfig,
}

impl ExecutorFactory {
    pub fn new(collaborators: EngineCollaborators) -> Self {
        Self {
            collaborators,
            policy_config: EnginePolicyConfig::default(),
        }
    }

    /// Override the governance configuration
    pub fn with_policy_config(mut self, policy_config: EnginePolicyConfig) -> Self {
        self.policy_config = policy_config;
        self
    }

    /// Build the executor matching the session's mode
    ///
    /// Fails with a config error when the session's tuning knobs are invalid
    /// and with a session error when a forked session lacks a parent.
    pub fn create(&self, session: &Session) -> ArbiterResult<Box<dyn SessionExecutor>> {
        let config = RuntimeConfig::from_session(session)?;
        let client = RuntimeClient::new(
            self.collaborators.connection.clone(),
            config.clone(),
            &session.id,
        );

        let mut context = ToolContext::new(&session.id);
        if let Some(user_id) = &session.user_id {
            context = context.with_user(user_id);
        }
        if let Some(working_dir) = &session.working_dir {
            context = context.with_working_dir(working_dir.clone());
        }

        let policies = self.build_policies(session);
        let hooks = self.build_hooks();
        let gate = Arc::new(GovernedToolGate::new(
            policies,
            hooks.clone(),
            self.collaborators.tool_calls.clone(),
            self.collaborators.audit.clone(),
        ));

        // Partial-message fanout only exists on the streaming strategies
        let broadcaster = if config.streaming {
            self.collaborators.broadcaster.clone()
        } else {
            None
        };
        let stream_handler = broadcaster
            .clone()
            .map(|b| Arc::new(StreamHandler::new(b, &session.id)));

        let message_handler = Arc::new(MessageHandler::new(
            self.collaborators.messages.clone(),
            self.collaborators.tool_calls.clone(),
            hooks.clone(),
            broadcaster,
            client.metrics(),
            context.clone(),
        ));
        let result_handler = Arc::new(ResultHandler::new(
            client.metrics(),
            self.collaborators.metrics.clone(),
            self.collaborators.sessions.clone(),
            &session.id,
        ));
        let error_handler = Arc::new(ErrorHandler::new(
            client.metrics(),
            self.collaborators.metrics.clone(),
            self.collaborators.sessions.clone(),
            self.collaborators.audit.clone(),
            &session.id,
        ));

        let core = ExecutorCore {
            session_id: session.id.clone(),
            client,
            gate,
            hooks,
            context,
            message_handler,
            result_handler,
            error_handler,
            interrupt: InterruptHandle::new(),
        };

        match session.mode {
            SessionMode::Interactive => {
                Ok(Box::new(InteractiveExecutor::new(core, stream_handler)))
            }
            SessionMode::Background => {
                let retry = RetryManager::new(
                    config.retry_policy(),
                    Arc::new(CircuitBreaker::new("runtime")),
                );
                Ok(Box::new(BackgroundExecutor::new(core, retry)))
            }
            SessionMode::Forked => {
                let parent_session_id = session.parent_session_id.clone().ok_or_else(|| {
                    ArbiterError::session("forked session is missing a parent session id")
                })?;
                Ok(Box::new(ForkedExecutor::new(
                    core,
                    stream_handler,
                    self.collaborators.messages.clone(),
                    parent_session_id,
                    session.fork_point,
                )))
            }
        }
    }

    fn build_policies(&self, session: &Session) -> PermissionPolicyEngine {
        let engine = PermissionPolicyEngine::new();
        if !self.policy_config.denied_tools.is_empty() {
            engine.register(
                Arc::new(ToolDenylistPolicy::new(
                    self.policy_config.denied_tools.clone(),
                )),
                priority::TOOL_DENYLIST,
            );
        }
        engine.register(
            Arc::new(ToolAllowlistPolicy::new(session.allowed_tools.clone())),
            priority::TOOL_ALLOWLIST,
        );
        engine.register(
            Arc::new(FileAccessPolicy::new(
                self.policy_config.restricted_read_paths.clone(),
                self.policy_config.allowed_write_paths.clone(),
            )),
            priority::FILE_ACCESS,
        );
        engine.register(
            Arc::new(CommandPatternPolicy::new(
                self.policy_config.blocked_command_patterns.clone(),
            )),
            priority::COMMAND_PATTERN,
        );
        engine.register(
            Arc::new(DomainPolicy::new(
                self.policy_config.allowed_domains.clone(),
                self.policy_config.blocked_domains.clone(),
            )),
            priority::DOMAIN,
        );
        engine
    }

    fn build_hooks(&self) -> HookPipeline {
        let registry = HookRegistry::new();
        registry.register(
            HookEvent::PreToolUse,
            Arc::new(AuditHook::new(self.collaborators.audit.clone())),
            AUDIT_HOOK_PRIORITY,
        );
        registry.register(
            HookEvent::PostToolUse,
            Arc::new(AuditHook::new(self.collaborators.audit.clone())),
            AUDIT_HOOK_PRIORITY,
        );

        let metrics_hook = Arc::new(MetricsHook::new());
        registry.register(
            HookEvent::PreToolUse,
            metrics_hook.clone(),
            METRICS_HOOK_PRIORITY,
        );
        registry.register(HookEvent::PostToolUse, metrics_hook, METRICS_HOOK_PRIORITY);

        if !self.policy_config.validation.is_empty() {
            registry.register(
                HookEvent::PreToolUse,
                Arc::new(self.policy_config.validation.clone()),
                VALIDATION_HOOK_PRIORITY,
            );
        }

        if let Some(broadcaster) = &self.collaborators.broadcaster {
            registry.register(
                HookEvent::PostToolUse,
                Arc::new(NotificationHook::new(broadcaster.clone())),
                NOTIFICATION_HOOK_PRIORITY,
            );
        }

        HookPipeline::new(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{GateDecision, ToolGate};
    use crate::policy::{PolicyDecision, ToolInvocationRequest};
    use crate::runtime::connection::{EventStream, QueryRequest};
    use crate::store::{
        MockAuditLog, MockMessageStore, MockMetricsStore, MockSessionStore, MockToolCallStore,
    };
    use async_trait::async_trait;
    use std::str::FromStr;

    struct NoopConnection;

    #[async_trait]
    impl RuntimeConnection for NoopConnection {
        async fn query(&self, _request: QueryRequest) -> ArbiterResult<EventStream> {
            let (_tx, rx) = tokio::sync::mpsc::channel(1);
            Ok(rx)
        }

        async fn interrupt(&self, _session_id: &str) -> ArbiterResult<()> {
            Ok(())
        }
    }

    fn collaborators() -> EngineCollaborators {
        EngineCollaborators {
            connection: Arc::new(NoopConnection),
            messages: Arc::new(MockMessageStore::new()),
            tool_calls: Arc::new(MockToolCallStore::new()),
            metrics: Arc::new(MockMetricsStore::new()),
            sessions: Arc::new(MockSessionStore::new()),
            audit: Arc::new(MockAuditLog::new()),
            broadcaster: None,
        }
    }

    #[test]
    fn creates_an_executor_per_mode() {
        let factory = ExecutorFactory::new(collaborators());
        for mode in [SessionMode::Interactive, SessionMode::Background] {
            let session = Session::new("s-1", mode, "sonnet");
            assert!(factory.create(&session).is_ok());
        }

        let forked = Session::new("s-2", SessionMode::Forked, "sonnet").with_parent("s-1", None);
        assert!(factory.create(&forked).is_ok());
    }

    #[test]
    fn forked_session_without_parent_is_rejected() {
        let factory = ExecutorFactory::new(collaborators());
        let session = Session::new("s-2", SessionMode::Forked, "sonnet");
        let err = factory.create(&session).err().unwrap();
        assert!(matches!(err, ArbiterError::Session(_)));
    }

    #[test]
    fn invalid_session_config_is_rejected() {
        let factory = ExecutorFactory::new(collaborators());
        let session = Session::new("s-1", SessionMode::Interactive, "sonnet").with_max_turns(0);
        assert!(matches!(
            factory.create(&session),
            Err(ArbiterError::Config(_))
        ));
    }

    #[test]
    fn unknown_mode_string_is_rejected_at_parse() {
        let err = SessionMode::from_str("detached").unwrap_err();
        assert!(matches!(err, ArbiterError::UnknownMode(_)));
    }

    #[tokio::test]
    async fn wired_gate_enforces_the_session_allow_list() {
        let mut tool_calls = MockToolCallStore::new();
        tool_calls.expect_upsert().returning(|_| Ok(()));
        let mut audit = MockAuditLog::new();
        audit.expect_record().returning(|_, _, _, _| Ok(()));

        let mut collaborators = collaborators();
        collaborators.tool_calls = Arc::new(tool_calls);
        collaborators.audit = Arc::new(audit);

        let factory = ExecutorFactory::new(collaborators);
        let session = Session::new("s-1", SessionMode::Interactive, "sonnet")
            .with_allowed_tools(vec!["read".to_string()]);

        // Rebuild the gate the way create() does and probe it directly
        let policies = factory.build_policies(&session);
        let hooks = factory.build_hooks();
        let gate = GovernedToolGate::new(
            policies,
            hooks,
            factory.collaborators.tool_calls.clone(),
            factory.collaborators.audit.clone(),
        );

        let allowed = gate
            .check(&ToolInvocationRequest::new(
                "read",
                "tu-1",
                serde_json::json!({"path": "/tmp/a"}),
                ToolContext::new("s-1"),
            ))
            .await;
        assert!(allowed.is_allowed());

        let denied = gate
            .check(&ToolInvocationRequest::new(
                "bash",
                "tu-2",
                serde_json::json!({"command": "ls"}),
                ToolContext::new("s-1"),
            ))
            .await;
        assert!(!denied.is_allowed());
    }

    #[tokio::test]
    async fn gate_decision_shape_is_stable() {
        let decision = GateDecision {
            decision: PolicyDecision::allow(),
            hook_output: None,
        };
        assert!(decision.is_allowed());
    }
}
