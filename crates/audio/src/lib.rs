//! Audio I/O adapters
//!
//! The transcription and synthesis models are external services; this
//! crate owns the contract around them:
//! - utterance delimiting (silence timeout, duration cap)
//! - pause/resume coordination while a reply is being handled
//! - playback routed to a named output device with default fallback

pub mod capture;
pub mod dsp;
pub mod phrase;
pub mod playback;
pub mod transcriber;

pub use capture::{SystemAudioTranscriber, TranscriberConfig};
pub use phrase::{PhraseAssembler, PhraseConfig};
pub use playback::{HttpSynthesizer, Synthesizer, SynthesizerConfig};
pub use transcriber::{PauseGuard, Transcriber};

use thiserror::Error;

/// Audio subsystem failures
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("speech service request failed: {0}")]
    Transport(String),

    #[error("could not decode speech service response: {0}")]
    Decode(String),
}
