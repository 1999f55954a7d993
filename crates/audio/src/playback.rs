//! Synthesized speech playback.
//!
//! Text goes to the external synthesis service; the WAV reply plays on
//! the configured output device (the virtual cable feeding the call).
//! An unknown device name falls back to the platform default with a
//! warning; playback problems never take the session down from here.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::dsp;
use crate::AudioError;

/// Speaks one reply, blocking until playback completes.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), AudioError>;
}

#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    /// Endpoint accepting `{"text": ...}` and returning WAV.
    pub synthesis_url: String,
    /// Playback device name; `None` or an unknown name uses the default.
    pub output_device: Option<String>,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            synthesis_url: "http://127.0.0.1:8179/synthesize".to_string(),
            output_device: None,
        }
    }
}

pub struct HttpSynthesizer {
    config: SynthesizerConfig,
    http: reqwest::Client,
}

impl HttpSynthesizer {
    pub fn new(config: SynthesizerConfig) -> Result<Self, AudioError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AudioError::Transport(e.to_string()))?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn speak(&self, text: &str) -> Result<(), AudioError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let response = self
            .http
            .post(&self.config.synthesis_url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| AudioError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| AudioError::Transport(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AudioError::Transport(e.to_string()))?;

        let (samples, rate) = decode_wav(&bytes)?;
        let device_name = self.config.output_device.clone();

        // The cpal stream is not Send; playback runs on a blocking thread
        // and this future resolves when the device has drained.
        tokio::task::spawn_blocking(move || play_samples(device_name.as_deref(), samples, rate))
            .await
            .map_err(|e| AudioError::Stream(e.to_string()))?
    }
}

/// Decode a WAV reply into mono f32 samples.
pub(crate) fn decode_wav(bytes: &[u8]) -> Result<(Vec<f32>, u32), AudioError> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| AudioError::Decode(e.to_string()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::Decode(e.to_string()))?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::Decode(e.to_string()))?,
    };

    let mono = if spec.channels > 1 {
        dsp::to_mono(&samples, spec.channels)
    } else {
        samples
    };

    Ok((mono, spec.sample_rate))
}

/// Resolve the playback device, falling back to the platform default
/// when the configured name is unknown.
fn resolve_output_device(name: Option<&str>) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();

    if let Some(name) = name {
        let requested = host
            .output_devices()
            .map_err(|e| AudioError::Device(format!("cannot enumerate devices: {e}")))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false));

        match requested {
            Some(device) => return Ok(device),
            None => tracing::warn!(
                "configured output device '{name}' not found, falling back to default output device"
            ),
        }
    }

    host.default_output_device()
        .ok_or_else(|| AudioError::Device("no default output device".to_string()))
}

/// Play mono samples and block until the queue drains.
fn play_samples(device_name: Option<&str>, samples: Vec<f32>, rate: u32) -> Result<(), AudioError> {
    let device = resolve_output_device(device_name)?;
    if let Ok(name) = device.name() {
        tracing::debug!("playing on output device: {name}");
    }

    let default_config = device
        .default_output_config()
        .map_err(|e| AudioError::Device(format!("no default output config: {e}")))?;
    let out_rate = default_config.sample_rate().0;
    let channels = default_config.channels() as usize;
    let stream_config = default_config.config();

    let queue = Arc::new(Mutex::new(VecDeque::from(dsp::resample(&samples, rate, out_rate))));
    let callback_queue = queue.clone();

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let Ok(mut queue) = callback_queue.lock() else {
                    data.fill(0.0);
                    return;
                };
                for frame in data.chunks_mut(channels) {
                    let sample = queue.pop_front().unwrap_or(0.0);
                    frame.fill(sample);
                }
            },
            |err| tracing::error!("audio output stream error: {err}"),
            None,
        )
        .map_err(|e| AudioError::Stream(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| AudioError::Stream(format!("failed to start output stream: {e}")))?;

    loop {
        let remaining = queue.lock().map(|q| q.len()).unwrap_or(0);
        if remaining == 0 {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    // Let the device buffer empty before tearing the stream down.
    std::thread::sleep(Duration::from_millis(150));
    drop(stream);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(samples: &[i16], channels: u16, rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buffer = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec).unwrap();
            for s in samples {
                writer.write_sample(*s).unwrap();
            }
            writer.finalize().unwrap();
        }
        buffer
    }

    #[test]
    fn test_decode_wav_mono_int() {
        let bytes = wav_bytes(&[0, i16::MAX, i16::MIN], 1, 22_050);
        let (samples, rate) = decode_wav(&bytes).unwrap();
        assert_eq!(rate, 22_050);
        assert_eq!(samples.len(), 3);
        assert!((samples[1] - (i16::MAX as f32 / 32_768.0)).abs() < 1e-4);
    }

    #[test]
    fn test_decode_wav_downmixes_stereo() {
        let bytes = wav_bytes(&[100, 300, 200, 400], 2, 16_000);
        let (samples, _) = decode_wav(&bytes).unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_decode_wav_rejects_garbage() {
        assert!(decode_wav(b"not a wav file").is_err());
    }

    #[tokio::test]
    async fn test_empty_text_is_a_no_op() {
        // No server configured: a request would fail, so success proves
        // the early return.
        let synthesizer = HttpSynthesizer::new(SynthesizerConfig {
            synthesis_url: "http://127.0.0.1:1/synthesize".to_string(),
            output_device: None,
        })
        .unwrap();
        synthesizer.speak("   ").await.unwrap();
    }
}
