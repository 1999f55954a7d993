//! System-audio transcriber.
//!
//! Captures the call audio from a (virtual) input device, gates it on
//! signal level, and posts each completed phrase to the external
//! transcription service as WAV.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dsp;
use crate::phrase::{PhraseAssembler, PhraseConfig};
use crate::transcriber::Transcriber;
use crate::AudioError;

#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    /// Capture device name; `None` selects the platform default.
    pub input_device: Option<String>,
    /// Endpoint accepting WAV and returning `{"text": ...}`.
    pub transcription_url: String,
    /// Rate audio is downsampled to before transcription.
    pub sample_rate: u32,
    pub phrase: PhraseConfig,
    /// RMS level above which a chunk counts as speech.
    pub speech_threshold: f32,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            transcription_url: "http://127.0.0.1:8178/inference".to_string(),
            sample_rate: 16_000,
            phrase: PhraseConfig::default(),
            speech_threshold: 0.01,
        }
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Transcriber fed by a cpal input stream.
///
/// The cpal stream lives on a dedicated thread (it is not `Send`);
/// chunks cross into the async world over a bounded channel.
pub struct SystemAudioTranscriber {
    config: TranscriberConfig,
    http: reqwest::Client,
    paused: AtomicBool,
}

impl SystemAudioTranscriber {
    pub fn new(config: TranscriberConfig) -> Result<Self, AudioError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AudioError::Transport(e.to_string()))?;

        Ok(Self {
            config,
            http,
            paused: AtomicBool::new(false),
        })
    }

    async fn flush_phrase(
        &self,
        phrase: Vec<f32>,
        utterances: &mpsc::Sender<String>,
    ) -> Result<(), AudioError> {
        if self.paused.load(Ordering::SeqCst) {
            tracing::debug!("paused, dropping completed phrase");
            return Ok(());
        }

        let text = match self.transcribe(&phrase).await {
            Ok(text) => text,
            Err(e) => {
                // One failed service call costs one phrase, not the call.
                tracing::warn!("transcription failed, dropping phrase: {e}");
                return Ok(());
            }
        };

        if text.is_empty() {
            return Ok(());
        }

        tracing::debug!(utterance = %text, "phrase transcribed");
        utterances
            .send(text)
            .await
            .map_err(|_| AudioError::Stream("utterance channel closed".to_string()))
    }

    async fn transcribe(&self, samples: &[f32]) -> Result<String, AudioError> {
        let wav = encode_wav(samples, self.config.sample_rate)?;

        let response = self
            .http
            .post(&self.config.transcription_url)
            .header("content-type", "audio/wav")
            .body(wav)
            .send()
            .await
            .map_err(|e| AudioError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| AudioError::Transport(e.to_string()))?;

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| AudioError::Decode(e.to_string()))?;

        Ok(body.text.trim().to_string())
    }
}

#[async_trait]
impl Transcriber for SystemAudioTranscriber {
    async fn run(
        &self,
        utterances: mpsc::Sender<String>,
        stop: CancellationToken,
    ) -> Result<(), AudioError> {
        let (chunk_tx, mut chunk_rx) = mpsc::channel::<Vec<f32>>(64);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), AudioError>>();
        let stop_flag = Arc::new(AtomicBool::new(false));

        let thread_config = self.config.clone();
        let thread_stop = stop_flag.clone();
        let handle =
            std::thread::spawn(move || capture_thread(thread_config, chunk_tx, ready_tx, thread_stop));

        match tokio::task::spawn_blocking(move || ready_rx.recv()).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => return Err(e),
            _ => return Err(AudioError::Stream("capture thread died during startup".to_string())),
        }
        tracing::info!("audio capture started");

        let mut assembler = PhraseAssembler::new(self.config.phrase);
        let result = loop {
            tokio::select! {
                _ = stop.cancelled() => break Ok(()),
                maybe_chunk = chunk_rx.recv() => {
                    let Some(chunk) = maybe_chunk else {
                        break Err(AudioError::Stream("audio capture ended unexpectedly".to_string()));
                    };
                    let speaking = dsp::rms(&chunk) > self.config.speech_threshold;
                    if let Some(phrase) = assembler.push(&chunk, speaking, Instant::now()) {
                        if let Err(e) = self.flush_phrase(phrase, &utterances).await {
                            break Err(e);
                        }
                    }
                }
            }
        };

        stop_flag.store(true, Ordering::SeqCst);
        let _ = handle.join();
        tracing::info!("audio capture stopped");
        result
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }
}

/// Owns the cpal input stream for the lifetime of one session.
fn capture_thread(
    config: TranscriberConfig,
    chunks: mpsc::Sender<Vec<f32>>,
    ready: std::sync::mpsc::Sender<Result<(), AudioError>>,
    stop: Arc<AtomicBool>,
) {
    let stream = (|| {
        let host = cpal::default_host();
        let device = match &config.input_device {
            Some(name) => host
                .input_devices()
                .map_err(|e| AudioError::Device(format!("cannot enumerate devices: {e}")))?
                .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                .ok_or_else(|| AudioError::Device(format!("input device '{name}' not found")))?,
            None => host
                .default_input_device()
                .ok_or_else(|| AudioError::Device("no default input device".to_string()))?,
        };

        if let Ok(name) = device.name() {
            tracing::info!("using input device: {name}");
        }

        let default_config = device
            .default_input_config()
            .map_err(|e| AudioError::Device(format!("no default input config: {e}")))?;
        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels();
        let stream_config = default_config.config();
        let target_rate = config.sample_rate;

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    let mono = dsp::to_mono(data, native_channels);
                    let samples = dsp::resample(&mono, native_rate, target_rate);
                    // try_send so the audio thread never blocks
                    if chunks.try_send(samples).is_err() {
                        tracing::debug!("audio channel full, dropping chunk");
                    }
                },
                |err| tracing::error!("audio input stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::Stream(format!("failed to build input stream: {e}")))?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(format!("failed to start input stream: {e}")))?;

        Ok(stream)
    })();

    match stream {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            while !stop.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(100));
            }
            drop(stream);
        }
        Err(e) => {
            let _ = ready.send(Err(e));
        }
    }
}

/// Encode mono f32 samples as 16-bit PCM WAV.
fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec)
            .map_err(|e| AudioError::Decode(e.to_string()))?;
        for sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            writer
                .write_sample(value)
                .map_err(|e| AudioError::Decode(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioError::Decode(e.to_string()))?;
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transcriber(url: String) -> SystemAudioTranscriber {
        SystemAudioTranscriber::new(TranscriberConfig {
            transcription_url: url,
            ..TranscriberConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_encode_wav_round_trips() {
        let samples = vec![0.0, 0.5, -0.5, 1.0];
        let wav = encode_wav(&samples, 16_000).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 16_000);
        let decoded: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[0], 0);
        assert_eq!(decoded[3], i16::MAX);
    }

    #[tokio::test]
    async fn test_transcribe_posts_wav_and_reads_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/inference"))
            .and(header("content-type", "audio/wav"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": " hello there "})))
            .mount(&server)
            .await;

        let transcriber = transcriber(format!("{}/inference", server.uri()));
        let text = transcriber.transcribe(&[0.1; 1600]).await.unwrap();
        assert_eq!(text, "hello there");
    }

    #[tokio::test]
    async fn test_paused_phrase_is_dropped_without_service_call() {
        // No mock server mounted: a service call would error, and an error
        // would surface. Pausing must short-circuit before the request.
        let transcriber = transcriber("http://127.0.0.1:1/inference".to_string());
        transcriber.pause();

        let (tx, mut rx) = mpsc::channel(1);
        transcriber.flush_phrase(vec![0.1; 160], &tx).await.unwrap();
        assert!(rx.try_recv().is_err());

        transcriber.resume();
        assert!(!transcriber.paused.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_service_failure_drops_phrase_but_not_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/inference"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let transcriber = transcriber(format!("{}/inference", server.uri()));
        let (tx, mut rx) = mpsc::channel(1);

        // Failure is swallowed; nothing is delivered.
        transcriber.flush_phrase(vec![0.1; 160], &tx).await.unwrap();
        assert!(rx.try_recv().is_err());
    }
}
