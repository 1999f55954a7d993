//! Chat trait and per-component chat sessions.
//!
//! A `ChatSession` owns one conversation history and the immutable system
//! prompt chosen at construction. Histories are never shared between
//! sessions or between components of the same call.

use std::sync::Arc;

use async_trait::async_trait;

use crate::prompt::{Message, Role};
use crate::LlmError;

/// Boundary to the external language model service.
#[async_trait]
pub trait Chat: Send + Sync {
    /// Run one completion over the full message history.
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;
}

/// One conversation with the model: system prompt plus alternating turns.
///
/// Invariant: the first message is always the system prompt, and it is the
/// only system message. If outside pruning ever violates this, the prompt
/// is re-inserted before the next model call.
pub struct ChatSession {
    client: Arc<dyn Chat>,
    system_prompt: String,
    messages: Vec<Message>,
}

impl ChatSession {
    pub fn new(client: Arc<dyn Chat>, system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        let messages = vec![Message::system(&system_prompt)];
        Self {
            client,
            system_prompt,
            messages,
        }
    }

    /// Submit one user turn and record the assistant's reply.
    pub async fn ask(&mut self, input: &str) -> Result<String, LlmError> {
        self.ensure_system_prompt();
        self.messages.push(Message::user(input));

        match self.client.complete(&self.messages).await {
            Ok(reply) => {
                self.messages.push(Message::assistant(&reply));
                Ok(reply)
            }
            Err(e) => {
                // Drop the unanswered turn so a retry starts clean.
                self.messages.pop();
                Err(e)
            }
        }
    }

    /// Record an assistant turn produced outside the model (the opening
    /// greeting), so later replies see it as context.
    pub fn push_assistant(&mut self, content: &str) {
        self.messages.push(Message::assistant(content));
    }

    /// Reset the history, retaining the system prompt.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.messages.push(Message::system(&self.system_prompt));
    }

    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    /// Test hook for simulating outside pruning of the history.
    #[cfg(test)]
    pub(crate) fn messages_mut(&mut self) -> &mut Vec<Message> {
        &mut self.messages
    }

    fn ensure_system_prompt(&mut self) {
        let intact = matches!(self.messages.first(), Some(m) if m.role == Role::System);
        if !intact {
            tracing::warn!("system prompt missing from chat history, re-inserting");
            self.messages.insert(0, Message::system(&self.system_prompt));
        }
    }
}
