//! One live call: audio in, conversation, audio out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use call_assistant_audio::{PauseGuard, Synthesizer, Transcriber};
use call_assistant_automation::ShiftService;
use call_assistant_llm::Chat;

use crate::conversation::ConversationCore;
use crate::prompts;
use crate::AgentError;

/// Owns the per-call resources and routes utterances to the core.
pub struct Session {
    call_id: String,
    transcriber: Arc<dyn Transcriber>,
    synthesizer: Arc<dyn Synthesizer>,
    core: ConversationCore,
}

impl Session {
    pub fn new(
        call_id: impl Into<String>,
        caller_phone: impl Into<String>,
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn Synthesizer>,
        chat_client: Arc<dyn Chat>,
        workflow: Arc<dyn ShiftService>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            core: ConversationCore::new(chat_client, workflow, caller_phone, stop),
            transcriber,
            synthesizer,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Run until the stop signal fires or the transcriber terminates.
    ///
    /// Utterances are processed strictly in arrival order: the
    /// transcriber stays paused for the whole of each turn, so no new
    /// utterance is dispatched until the previous reply is out.
    pub async fn run(mut self, stop: CancellationToken) -> Result<(), AgentError> {
        tracing::info!(call_id = %self.call_id, "session running");

        let (utterance_tx, mut utterance_rx) = mpsc::channel::<String>(8);

        let greeting = self.core.greet();
        self.speak_best_effort(greeting).await;

        let transcriber = self.transcriber.clone();
        let producer_stop = stop.clone();
        let mut producer =
            tokio::spawn(async move { transcriber.run(utterance_tx, producer_stop).await });

        let result = loop {
            tokio::select! {
                _ = stop.cancelled() => break Ok(()),

                produced = &mut producer => {
                    break match produced {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => {
                            tracing::error!(call_id = %self.call_id, "transcriber failed: {e}");
                            self.speak_best_effort(prompts::TRANSCRIBER_APOLOGY).await;
                            Err(e.into())
                        }
                        Err(join_error) => {
                            tracing::error!(call_id = %self.call_id, "transcriber task died: {join_error}");
                            Err(AgentError::Stopped)
                        }
                    };
                }

                Some(utterance) = utterance_rx.recv() => {
                    let _pause = PauseGuard::hold(self.transcriber.as_ref());
                    tracing::info!(call_id = %self.call_id, %utterance, "utterance received");

                    match self.core.on_utterance(&utterance).await {
                        Ok(reply) => {
                            if !reply.is_empty() {
                                self.speak_best_effort(&reply).await;
                            }
                        }
                        Err(AgentError::Stopped) => break Ok(()),
                        Err(e) => {
                            tracing::error!(call_id = %self.call_id, "utterance handling failed: {e}");
                            self.core.reset_context();
                            self.speak_best_effort(prompts::GENERIC_APOLOGY).await;
                        }
                    }
                }
            }
        };

        stop.cancel();
        tracing::info!(call_id = %self.call_id, "session finished");
        result
    }

    /// Synthesizer failures drop the reply, never the session.
    async fn speak_best_effort(&self, text: &str) {
        tracing::info!(call_id = %self.call_id, reply = %text, "speaking");
        if let Err(e) = self.synthesizer.speak(text).await {
            tracing::warn!(call_id = %self.call_id, "synthesizer failed, reply dropped: {e}");
        }
    }
}
