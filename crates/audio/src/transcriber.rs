//! Transcriber trait and pause coordination.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::AudioError;

/// Produces completed utterances for one call.
///
/// Events are delivered on a single logical task per session; the
/// consumer never sees concurrent utterances for one call.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Produce utterances on `utterances` until `stop` fires or the audio
    /// source fails. A failure here is fatal to the session.
    async fn run(
        &self,
        utterances: mpsc::Sender<String>,
        stop: CancellationToken,
    ) -> Result<(), AudioError>;

    /// Suppress utterance delivery. Idempotent; capture may continue.
    fn pause(&self);

    /// Resume utterance delivery. Idempotent.
    fn resume(&self);
}

/// Holds the transcriber paused for the scope of one utterance's handling.
///
/// The pause is the serialization mechanism between turns: no new
/// utterance reaches the conversation while the guard is alive.
pub struct PauseGuard<'a> {
    transcriber: &'a dyn Transcriber,
}

impl<'a> PauseGuard<'a> {
    pub fn hold(transcriber: &'a dyn Transcriber) -> Self {
        transcriber.pause();
        Self { transcriber }
    }
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.transcriber.resume();
    }
}
