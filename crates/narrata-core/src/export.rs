//! Audio export to WAV and compressed container formats.
//!
//! WAV files are written directly. Compressed formats go through an
//! `ffmpeg` subprocess fed with a temporary WAV file, so mp3 and m4b
//! output requires `ffmpeg` on the `PATH`.

use crate::assembler::AudioBuffer;
use crate::error::{NarrataError, NarrataResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Supported output containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Uncompressed PCM
    Wav,
    /// MPEG layer 3
    Mp3,
    /// MPEG-4 audiobook
    M4b,
}

impl AudioFormat {
    /// File extension without the dot
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::M4b => "m4b",
        }
    }

    /// Human-readable name
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Wav => "WAV (uncompressed)",
            Self::Mp3 => "MP3 (compressed)",
            Self::M4b => "M4B (audiobook)",
        }
    }

    /// MIME type for serving files of this format
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::M4b => "audio/mp4",
        }
    }

    /// Whether writing this format needs the external encoder
    #[must_use]
    pub const fn needs_encoder(&self) -> bool {
        !matches!(self, Self::Wav)
    }

    /// All supported formats
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Wav, Self::Mp3, Self::M4b]
    }

    /// Look up a format by file extension
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            "m4b" | "m4a" => Some(Self::M4b),
            _ => None,
        }
    }

    /// Look up a format from a path's extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Encoding parameters for exported audio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingSettings {
    /// Sample rate in Hz used when a buffer does not carry its own
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// PCM bit depth
    pub bit_depth: u16,
    /// Bitrate in kbit/s for compressed formats
    pub bitrate_kbps: u32,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            sample_rate: crate::DEFAULT_SAMPLE_RATE,
            channels: crate::DEFAULT_CHANNELS,
            bit_depth: 16,
            bitrate_kbps: 64,
        }
    }
}

impl EncodingSettings {
    /// Create default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback sample rate
    ///
    /// # Errors
    ///
    /// Returns an error if the rate is outside 8000..=192000 Hz.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> NarrataResult<Self> {
        if !(8_000..=192_000).contains(&sample_rate) {
            return Err(NarrataError::configuration(format!(
                "Sample rate must be between 8000 and 192000 Hz, got {sample_rate}"
            )));
        }
        self.sample_rate = sample_rate;
        Ok(self)
    }

    /// Set the channel count
    ///
    /// # Errors
    ///
    /// Returns an error for anything but mono or stereo.
    pub fn with_channels(mut self, channels: u16) -> NarrataResult<Self> {
        if !(1..=2).contains(&channels) {
            return Err(NarrataError::configuration(format!(
                "Channels must be 1 or 2, got {channels}"
            )));
        }
        self.channels = channels;
        Ok(self)
    }

    /// Set the PCM bit depth
    ///
    /// # Errors
    ///
    /// Returns an error unless the depth is 16, 24 or 32.
    pub fn with_bit_depth(mut self, bit_depth: u16) -> NarrataResult<Self> {
        if !matches!(bit_depth, 16 | 24 | 32) {
            return Err(NarrataError::configuration(format!(
                "Bit depth must be 16, 24 or 32, got {bit_depth}"
            )));
        }
        self.bit_depth = bit_depth;
        Ok(self)
    }

    /// Set the compressed bitrate
    ///
    /// # Errors
    ///
    /// Returns an error if the bitrate is outside 32..=320 kbit/s.
    pub fn with_bitrate_kbps(mut self, bitrate_kbps: u32) -> NarrataResult<Self> {
        if !(32..=320).contains(&bitrate_kbps) {
            return Err(NarrataError::configuration(format!(
                "Bitrate must be between 32 and 320 kbit/s, got {bitrate_kbps}"
            )));
        }
        self.bitrate_kbps = bitrate_kbps;
        Ok(self)
    }
}

static FFMPEG_AVAILABLE: Lazy<bool> = Lazy::new(|| {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
});

/// Whether the external encoder was found on the `PATH`
///
/// Probed once per process.
#[must_use]
pub fn encoder_available() -> bool {
    *FFMPEG_AVAILABLE
}

/// Writes audio buffers to disk
#[derive(Debug, Clone)]
pub struct AudioWriter {
    settings: EncodingSettings,
}

impl AudioWriter {
    /// Create a writer with default settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: EncodingSettings::default(),
        }
    }

    /// Create a writer with custom settings
    #[must_use]
    pub const fn with_settings(settings: EncodingSettings) -> Self {
        Self { settings }
    }

    /// Current encoding settings
    #[must_use]
    pub const fn settings(&self) -> &EncodingSettings {
        &self.settings
    }

    /// Write a buffer to `path` in the given format
    ///
    /// Parent directories are created as needed. The buffer's own sample
    /// rate is written to the file header. With a stereo channel setting
    /// the mono stream is duplicated onto both channels.
    ///
    /// # Errors
    ///
    /// Returns [`NarrataError::InvalidInput`] for empty or non-finite
    /// audio, [`NarrataError::EncodingError`] when the encoder is missing
    /// or fails, and [`NarrataError::FileError`] on I/O problems.
    pub fn write_file(
        &self,
        buffer: &AudioBuffer,
        path: &Path,
        format: AudioFormat,
    ) -> NarrataResult<()> {
        self.validate_buffer(buffer)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!(
            "Writing {:.1}s of audio to {} as {}",
            buffer.duration_secs(),
            path.display(),
            format.description()
        );

        match format {
            AudioFormat::Wav => self.write_wav(buffer, path),
            AudioFormat::Mp3 | AudioFormat::M4b => self.encode_via_ffmpeg(buffer, path),
        }
    }

    fn validate_buffer(&self, buffer: &AudioBuffer) -> NarrataResult<()> {
        if buffer.is_empty() {
            return Err(NarrataError::invalid_input("No audio samples to write"));
        }
        if buffer.samples.iter().any(|sample| !sample.is_finite()) {
            return Err(NarrataError::invalid_input(
                "Audio contains non-finite samples",
            ));
        }
        let clipped = buffer
            .samples
            .iter()
            .filter(|sample| sample.abs() > 1.0)
            .count();
        if clipped > 0 {
            warn!("{clipped} sample(s) exceed full scale and will clip");
        }
        Ok(())
    }

    fn write_wav(&self, buffer: &AudioBuffer, path: &Path) -> NarrataResult<()> {
        let channels = self.settings.channels;
        let spec = hound::WavSpec {
            channels,
            sample_rate: buffer.sample_rate,
            bits_per_sample: self.settings.bit_depth,
            sample_format: hound::SampleFormat::Int,
        };

        // Buffers are mono; a stereo setting writes each sample once per
        // channel so every frame is complete
        let mut writer = hound::WavWriter::create(path, spec)?;
        match self.settings.bit_depth {
            16 => {
                for sample in &buffer.samples {
                    #[allow(clippy::cast_possible_truncation)]
                    let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16;
                    for _ in 0..channels {
                        writer.write_sample(value)?;
                    }
                }
            }
            24 | 32 => {
                let scale = if self.settings.bit_depth == 24 {
                    8_388_607.0
                } else {
                    2_147_483_647.0
                };
                for sample in &buffer.samples {
                    #[allow(clippy::cast_possible_truncation)]
                    let value = (f64::from(sample.clamp(-1.0, 1.0)) * scale).round() as i32;
                    for _ in 0..channels {
                        writer.write_sample(value)?;
                    }
                }
            }
            other => {
                return Err(NarrataError::configuration(format!(
                    "Unsupported bit depth: {other}"
                )))
            }
        }
        writer.finalize()?;

        debug!("Wrote {} samples to {}", buffer.len(), path.display());
        Ok(())
    }

    fn encode_via_ffmpeg(&self, buffer: &AudioBuffer, path: &Path) -> NarrataResult<()> {
        if !encoder_available() {
            return Err(NarrataError::encoding(
                "ffmpeg not found on PATH; required for mp3 and m4b output",
            ));
        }

        let staging = staging_wav_path();
        self.write_wav(buffer, &staging)?;
        let result = run_ffmpeg(&staging, path, self.settings.bitrate_kbps);
        let _ = std::fs::remove_file(&staging);
        result
    }
}

impl Default for AudioWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn staging_wav_path() -> PathBuf {
    std::env::temp_dir().join(format!("narrata-{}.wav", uuid::Uuid::new_v4()))
}

fn run_ffmpeg(input: &Path, output: &Path, bitrate_kbps: u32) -> NarrataResult<()> {
    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(input)
        .arg("-b:a")
        .arg(format!("{bitrate_kbps}k"))
        .arg(output)
        .output()
        .map_err(|e| NarrataError::encoding(format!("Failed to run ffmpeg: {e}")))?;

    if !status.status.success() {
        let stderr = String::from_utf8_lossy(&status.stderr);
        let diagnostic = stderr
            .lines()
            .filter(|line| !line.trim().is_empty())
            .next_back()
            .unwrap_or("no diagnostic output");
        return Err(NarrataError::encoding(format!(
            "ffmpeg exited with {}: {diagnostic}",
            status.status
        )));
    }

    debug!("Encoded {} to {}", input.display(), output.display());
    Ok(())
}
