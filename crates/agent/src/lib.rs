//! Per-call conversation engine
//!
//! Turns transcribed utterances into spoken replies by way of a model
//! dialogue with action tags, bounded observation recursion, and the
//! shift workflow behind it.

pub mod context;
pub mod conversation;
pub mod prompts;
pub mod reply;
pub mod session;

pub use context::ConversationContext;
pub use conversation::{ConversationCore, MAX_DEPTH};
pub use reply::{parse_action, sanitize, Action};
pub use session::Session;

use thiserror::Error;

use call_assistant_audio::AudioError;
use call_assistant_automation::WorkflowError;
use call_assistant_llm::LlmError;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("chat failure: {0}")]
    Chat(#[from] LlmError),

    #[error("workflow failure: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("audio failure: {0}")]
    Audio(#[from] AudioError),

    #[error("session stopped")]
    Stopped,
}
