//! Language model plumbing
//!
//! The `Chat` trait is the boundary to the external model service; the
//! rest of this crate is history management (`ChatSession`), the HTTP
//! client (`OllamaChat`), and the date reasoning component.

pub mod chat;
pub mod ollama;
pub mod prompt;
pub mod reasoner;

pub use chat::{Chat, ChatSession};
pub use ollama::OllamaChat;
pub use prompt::{Message, Role};
pub use reasoner::{DateReasoner, ReasonedDates, ShiftIntent};

use std::time::Duration;

use thiserror::Error;

/// Model call failures
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("chat request failed: {0}")]
    Transport(String),

    #[error("chat request timed out after {0:?}")]
    Timeout(Duration),

    #[error("model returned an empty reply")]
    EmptyReply,

    #[error("malformed model response: {0}")]
    InvalidResponse(String),
}
