//! Utterance delimiting.
//!
//! Captured audio becomes one utterance when the caller goes quiet for
//! the silence timeout, or unconditionally once the phrase hits the
//! duration cap.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct PhraseConfig {
    /// Silence gap that closes an utterance.
    pub silence_timeout: Duration,
    /// Hard cap on one utterance's length.
    pub max_phrase: Duration,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            silence_timeout: Duration::from_secs(5),
            max_phrase: Duration::from_secs(15),
        }
    }
}

/// Accumulates speech-gated audio chunks into complete phrases.
///
/// Pure state machine; callers supply `now` so it can be driven in tests.
pub struct PhraseAssembler {
    config: PhraseConfig,
    samples: Vec<f32>,
    started_at: Option<Instant>,
    last_speech_at: Option<Instant>,
}

impl PhraseAssembler {
    pub fn new(config: PhraseConfig) -> Self {
        Self {
            config,
            samples: Vec::new(),
            started_at: None,
            last_speech_at: None,
        }
    }

    /// Feed one captured chunk. Returns the completed phrase's samples
    /// when the silence timeout or duration cap closes it.
    pub fn push(&mut self, chunk: &[f32], is_speech: bool, now: Instant) -> Option<Vec<f32>> {
        if is_speech {
            if self.started_at.is_none() {
                self.started_at = Some(now);
            }
            self.last_speech_at = Some(now);
            self.samples.extend_from_slice(chunk);

            let started = self.started_at.unwrap_or(now);
            if now.duration_since(started) >= self.config.max_phrase {
                return self.take();
            }
            return None;
        }

        if let (Some(_), Some(last)) = (self.started_at, self.last_speech_at) {
            // Trailing audio belongs to the phrase; the model is better at
            // trimming it than we are at cutting mid-word.
            self.samples.extend_from_slice(chunk);
            if now.duration_since(last) >= self.config.silence_timeout {
                return self.take();
            }
        }
        None
    }

    /// Drop any partial phrase (used when delivery is suppressed).
    pub fn discard(&mut self) {
        self.samples.clear();
        self.started_at = None;
        self.last_speech_at = None;
    }

    fn take(&mut self) -> Option<Vec<f32>> {
        let samples = std::mem::take(&mut self.samples);
        self.started_at = None;
        self.last_speech_at = None;
        if samples.is_empty() {
            None
        } else {
            Some(samples)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PhraseConfig {
        PhraseConfig {
            silence_timeout: Duration::from_secs(5),
            max_phrase: Duration::from_secs(15),
        }
    }

    #[test]
    fn test_silence_closes_phrase() {
        let mut assembler = PhraseAssembler::new(config());
        let t0 = Instant::now();

        assert!(assembler.push(&[0.5; 160], true, t0).is_none());
        assert!(assembler
            .push(&[0.0; 160], false, t0 + Duration::from_secs(2))
            .is_none());

        let phrase = assembler
            .push(&[0.0; 160], false, t0 + Duration::from_secs(6))
            .expect("silence timeout should close the phrase");
        assert_eq!(phrase.len(), 480);
    }

    #[test]
    fn test_duration_cap_closes_phrase() {
        let mut assembler = PhraseAssembler::new(config());
        let t0 = Instant::now();

        assert!(assembler.push(&[0.5; 160], true, t0).is_none());
        let phrase = assembler.push(&[0.5; 160], true, t0 + Duration::from_secs(15));
        assert!(phrase.is_some());
    }

    #[test]
    fn test_silence_before_speech_is_ignored() {
        let mut assembler = PhraseAssembler::new(config());
        let t0 = Instant::now();

        assert!(assembler.push(&[0.0; 160], false, t0).is_none());
        assert!(assembler
            .push(&[0.0; 160], false, t0 + Duration::from_secs(10))
            .is_none());
    }

    #[test]
    fn test_discard_drops_partial_phrase() {
        let mut assembler = PhraseAssembler::new(config());
        let t0 = Instant::now();

        assembler.push(&[0.5; 160], true, t0);
        assembler.discard();
        assert!(assembler
            .push(&[0.0; 160], false, t0 + Duration::from_secs(6))
            .is_none());
    }

    #[test]
    fn test_new_phrase_starts_after_flush() {
        let mut assembler = PhraseAssembler::new(config());
        let t0 = Instant::now();

        assembler.push(&[0.5; 160], true, t0);
        assembler
            .push(&[0.0; 160], false, t0 + Duration::from_secs(6))
            .unwrap();

        let t1 = t0 + Duration::from_secs(10);
        assert!(assembler.push(&[0.5; 160], true, t1).is_none());
        assert!(assembler
            .push(&[0.0; 160], false, t1 + Duration::from_secs(6))
            .is_some());
    }
}
