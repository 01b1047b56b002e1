//! Runtime event vocabulary
//!
//! The external agent runtime is a black box that yields a sequence of typed
//! events per query. The shapes here are a fixed protocol: assistant messages
//! carrying content blocks, partial stream updates, and a single terminal
//! result event.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::metrics::TokenUsage;

/// One event from the runtime's response stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A complete assistant message
    Assistant(AssistantMessage),
    /// Partial update for live viewers
    Stream(StreamEvent),
    /// Terminal event closing the query
    Result(ResultEvent),
}

/// Content block inside an assistant message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Value,
        is_error: bool,
    },
}

/// Assistant message emitted by the runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub id: Uuid,
    pub model: String,
    pub content: Vec<ContentBlock>,
}

impl AssistantMessage {
    /// Create a message with the given blocks
    pub fn new(model: impl Into<String>, content: Vec<ContentBlock>) -> Self {
        Self {
            id: Uuid::new_v4(),
            model: model.into(),
            content,
        }
    }

    /// Concatenated text of all text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Whether any block requests a tool invocation
    pub fn has_tool_use(&self) -> bool {
        self.content
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }
}

/// Partial update payload for subscriber fanout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    pub payload: Value,
}

/// Terminal result event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEvent {
    /// Event identity; finalization is deduplicated on it
    pub id: Uuid,
    pub duration_ms: u64,
    pub total_cost_usd: f64,
    pub num_turns: u32,
    pub usage: TokenUsage,
    pub is_error: bool,
    /// Final textual result, or the error description when `is_error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}
