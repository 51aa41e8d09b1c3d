//! Synthesis backend port and the HTTP implementation.
//!
//! The renderer only knows [`SynthesisPort`]. A backend receives plain
//! text plus voice and speed and yields ordered audio segments; several
//! segments from one call are concatenated in place by the caller.

use crate::assembler::AudioBuffer;
use crate::error::{NarrataError, NarrataResult};
use async_trait::async_trait;
use serde::Serialize;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Default request timeout for HTTP synthesis backends
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Text-to-speech backend boundary
///
/// Implementations must be safe to share across tasks; the renderer may
/// call `synthesize` from several concurrent workers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SynthesisPort: Send + Sync {
    /// Synthesize one chunk of plain text into ordered audio segments
    ///
    /// # Errors
    ///
    /// Returns [`NarrataError::SynthesisUnavailable`] when the backend
    /// cannot produce audio.
    async fn synthesize(&self, text: &str, voice: &str, speed: f32)
        -> NarrataResult<Vec<AudioBuffer>>;
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice: &'a str,
    speed: f32,
}

/// Synthesis backend speaking to a TTS server over HTTP
///
/// Sends `{text, voice, speed}` as JSON and expects a WAV body in return.
#[derive(Debug, Clone)]
pub struct HttpSynthesizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSynthesizer {
    /// Create a synthesizer for the given endpoint with the default timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(endpoint: impl Into<String>) -> NarrataResult<Self> {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a synthesizer with a custom request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> NarrataResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Endpoint URL this synthesizer posts to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SynthesisPort for HttpSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
    ) -> NarrataResult<Vec<AudioBuffer>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Requesting synthesis of {} chars with voice {} at {}x",
            text.len(),
            voice,
            speed
        );

        let request = SynthesisRequest { text, voice, speed };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                NarrataError::synthesis_unavailable(format!("TTS request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| String::new());
            let excerpt: String = body.chars().take(200).collect();
            return Err(NarrataError::synthesis_unavailable(format!(
                "TTS server returned {status}: {excerpt}"
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            NarrataError::synthesis_unavailable(format!("Failed to read TTS response: {e}"))
        })?;

        let buffer = decode_wav(&bytes)?;
        Ok(vec![buffer])
    }
}

/// Decode a WAV byte stream into a mono buffer
///
/// Integer samples are scaled into [-1.0, 1.0] and multi-channel audio is
/// downmixed by averaging the frame.
fn decode_wav(bytes: &[u8]) -> NarrataResult<AudioBuffer> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let samples = if spec.channels <= 1 {
        samples
    } else {
        let channels = spec.channels as usize;
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(AudioBuffer::new(spec.sample_rate, samples))
}
