//! Event handlers
//!
//! Handlers convert runtime events into persistence calls against the
//! injected collaborators and finalize metrics. Broadcasting is best-effort
//! throughout: a slow or failing subscriber never stalls persistence or the
//! next event.

pub mod error;
pub mod message;
pub mod result;
pub mod stream;

pub use error::ErrorHandler;
pub use message::MessageHandler;
pub use result::ResultHandler;
pub use stream::StreamHandler;
