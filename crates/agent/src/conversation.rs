//! The conversation core: one utterance in, at most one spoken reply out.
//!
//! Each utterance goes to the model; replies either carry an action tag,
//! whose handler may inject a system observation and recurse, or they
//! are sanitized and spoken as-is. Recursion is bounded: a chain deeper
//! than `MAX_DEPTH` is treated as model runaway and collapsed to speech.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use call_assistant_automation::{ShiftService, WorkflowError};
use call_assistant_llm::{Chat, ChatSession, ShiftIntent};

use crate::context::ConversationContext;
use crate::prompts;
use crate::reply::{parse_action, sanitize, Action};
use crate::AgentError;

/// Deepest admissible tag chain: get -> confirm -> reason -> final
/// speech, with one slot spare.
pub const MAX_DEPTH: usize = 4;

pub struct ConversationCore {
    chat: ChatSession,
    context: ConversationContext,
    workflow: Arc<dyn ShiftService>,
    caller_phone: String,
    stop: CancellationToken,
}

impl ConversationCore {
    pub fn new(
        chat_client: Arc<dyn Chat>,
        workflow: Arc<dyn ShiftService>,
        caller_phone: impl Into<String>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            chat: ChatSession::new(chat_client, prompts::SYSTEM_PROMPT),
            context: ConversationContext::default(),
            workflow,
            caller_phone: caller_phone.into(),
            stop,
        }
    }

    /// Opening line for a new call, recorded as an assistant turn so the
    /// model knows the conversation it is joining.
    pub fn greet(&mut self) -> &'static str {
        self.chat.push_assistant(prompts::GREETING);
        prompts::GREETING
    }

    /// Translate one complete utterance into the reply to synthesize.
    ///
    /// Failures below this point become spoken apologies; only a session
    /// stop propagates out as an error.
    pub async fn on_utterance(&mut self, text: &str) -> Result<String, AgentError> {
        match self.process(text.to_string(), 0).await {
            Ok(reply) => Ok(reply),
            Err(AgentError::Workflow(WorkflowError::Interrupted)) => Err(AgentError::Stopped),
            Err(AgentError::Workflow(e)) => {
                tracing::warn!("workflow failed: {e}");
                self.context.reset();
                Ok(prompts::workflow_apology(&e).to_string())
            }
            Err(AgentError::Chat(e)) => {
                tracing::error!("chat failed: {e}");
                self.context.reset();
                Ok(prompts::GENERIC_APOLOGY.to_string())
            }
            Err(e) => Err(e),
        }
    }

    pub fn reset_context(&mut self) {
        self.context.reset();
    }

    fn process(
        &mut self,
        input: String,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = Result<String, AgentError>> + Send + '_>> {
        Box::pin(async move {
            if depth > MAX_DEPTH {
                tracing::warn!(depth, "tag chain exceeded the depth bound, collapsing to speech");
                return Ok(sanitize(&input));
            }
            if self.stop.is_cancelled() {
                return Err(AgentError::Stopped);
            }

            let raw = self.chat.ask(&input).await?;
            tracing::debug!(depth, reply = %raw, "model reply");

            match parse_action(&raw) {
                Some(Action::GetShifts(query)) => {
                    // An empty payload means the tag stood alone; the
                    // triggering input is the best available query.
                    let query = if query.is_empty() { input } else { query };
                    self.handle_get_shifts(query, depth).await
                }
                Some(Action::ConfirmCancel(shift_id)) => {
                    self.handle_confirm_cancel(&shift_id, depth).await
                }
                Some(Action::Reason(reason)) => self.handle_reason(&reason, depth).await,
                Some(Action::Login) => Ok(prompts::TRANSFER_LOGIN.to_string()),
                Some(Action::Real) => Ok(prompts::TRANSFER_REAL.to_string()),
                Some(Action::Deny) => Ok(prompts::REFUSAL.to_string()),
                None => Ok(sanitize(&raw)),
            }
        })
    }

    async fn handle_get_shifts(&mut self, query: String, depth: usize) -> Result<String, AgentError> {
        if self.caller_phone.is_empty() {
            return Ok(
                "I'm sorry, I don't have your phone number on file. Please contact support."
                    .to_string(),
            );
        }

        let result = self
            .workflow
            .lookup(&self.caller_phone, &query, &self.stop)
            .await?;

        let shifts = result.filtered_shifts;
        self.context.staff_info = Some(result.staff);
        self.context.is_cancellation = result.intent == ShiftIntent::Cancel;

        let payload = serde_json::to_string(
            &shifts
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "client": s.client_name,
                        "date": s.date_display(),
                        "time": s.time,
                        "shift_id": s.shift_id,
                    })
                })
                .collect::<Vec<_>>(),
        )
        .unwrap_or_else(|_| "[]".to_string());

        let mut observation = format!("SYSTEM: Found {} shift(s): {}", shifts.len(), payload);
        observation.push_str(if self.context.is_cancellation {
            " | User wants to CANCEL a shift."
        } else {
            " | User wants to VIEW shift info."
        });

        self.context.current_shifts = shifts;
        self.process(observation, depth + 1).await
    }

    async fn handle_confirm_cancel(
        &mut self,
        shift_id: &str,
        depth: usize,
    ) -> Result<String, AgentError> {
        match self.context.find_shift(shift_id).cloned() {
            Some(shift) => {
                tracing::info!(shift_id = %shift.shift_id, "cancellation target selected");
                self.context.selected_shift = Some(shift);
                self.process(
                    "SYSTEM: User confirmed cancellation. Now ask for the reason.".to_string(),
                    depth + 1,
                )
                .await
            }
            None => {
                tracing::warn!(shift_id, "confirm-cancel for an unknown shift id");
                self.process(
                    "SYSTEM: That shift id does not match any shift on file. Ask the user which shift they meant."
                        .to_string(),
                    depth + 1,
                )
                .await
            }
        }
    }

    async fn handle_reason(&mut self, reason: &str, depth: usize) -> Result<String, AgentError> {
        let (Some(staff), Some(shift)) = (
            self.context.staff_info.clone(),
            self.context.selected_shift.clone(),
        ) else {
            return Ok(prompts::LOST_SHIFT_APOLOGY.to_string());
        };

        match self.workflow.submit_cancellation(&staff, &shift, reason).await {
            Ok(()) => {
                self.context.selected_shift = None;
                self.context.current_shifts.clear();
                let observation = format!(
                    "SYSTEM: Cancellation successful. Shift at {} on {} at {} has been cancelled. \
                     Reason: {}. Thank the user and ask if there's anything else.",
                    shift.client_name,
                    shift.date_display(),
                    shift.time,
                    reason
                );
                self.process(observation, depth + 1).await
            }
            Err(WorkflowError::Interrupted) => Err(AgentError::Stopped),
            Err(e) => {
                tracing::warn!("cancellation submission failed: {e}");
                self.process(
                    "SYSTEM: The cancellation submission failed. Apologize and suggest trying again shortly."
                        .to_string(),
                    depth + 1,
                )
                .await
            }
        }
    }
}
