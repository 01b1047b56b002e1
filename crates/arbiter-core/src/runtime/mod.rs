//! Boundary to the external agent runtime
//!
//! The runtime's connection and message protocol are out of scope; this
//! module defines the event vocabulary the engine consumes, the connection
//! trait the surrounding application implements, and the per-session client
//! that owns configuration and metrics.

pub mod client;
pub mod connection;
pub mod events;

pub use client::RuntimeClient;
pub use connection::{EventStream, QueryRequest, RuntimeConnection};
pub use events::{AgentEvent, AssistantMessage, ContentBlock, ResultEvent, StreamEvent};
