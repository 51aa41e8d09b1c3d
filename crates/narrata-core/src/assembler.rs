//! Audio buffer concatenation and peak normalization.

use crate::error::{NarrataError, NarrataResult};
use rayon::prelude::*;
use tracing::debug;

/// Sample count above which normalization uses the rayon thread pool
const PARALLEL_THRESHOLD: usize = 64 * 1024;

/// A mono PCM buffer of `f32` samples at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved mono samples in the range [-1.0, 1.0]
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    /// Create a buffer from raw samples
    #[must_use]
    pub const fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Create a silent buffer of the given duration
    #[must_use]
    pub fn silence(duration_secs: f32, sample_rate: u32) -> Self {
        let count = (duration_secs * sample_rate as f32).round() as usize;
        Self {
            sample_rate,
            samples: vec![0.0; count],
        }
    }

    /// Number of samples in the buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check whether the buffer holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback duration in seconds
    #[must_use]
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Largest absolute sample value
    #[must_use]
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .fold(0.0_f32, |acc, &s| acc.max(s.abs()))
    }
}

/// Concatenates ordered buffers and normalizes the result to a target peak
#[derive(Debug, Clone)]
pub struct AudioAssembler {
    target_peak: f32,
}

impl AudioAssembler {
    /// Create an assembler with the standard 0.95 target peak
    #[must_use]
    pub fn new() -> Self {
        Self {
            target_peak: crate::NORMALIZATION_PEAK,
        }
    }

    /// Set a custom target peak
    ///
    /// # Errors
    ///
    /// Returns an error if the peak is not within (0.0, 1.0]
    pub fn with_target_peak(mut self, target_peak: f32) -> NarrataResult<Self> {
        if !target_peak.is_finite() || target_peak <= 0.0 || target_peak > 1.0 {
            return Err(NarrataError::invalid_input(format!(
                "Target peak must be within (0.0, 1.0], got {target_peak}"
            )));
        }
        self.target_peak = target_peak;
        Ok(self)
    }

    /// Concatenate buffers in order and peak-normalize the result
    ///
    /// All buffers must share one sample rate; mismatches are fatal and
    /// never resampled. A result whose peak is zero (all silence) is left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`NarrataError::EmptyInput`] for an empty buffer list and
    /// [`NarrataError::SampleRateMismatch`] when rates disagree.
    pub fn assemble(&self, buffers: &[AudioBuffer]) -> NarrataResult<AudioBuffer> {
        let first = buffers.first().ok_or(NarrataError::EmptyInput)?;
        let sample_rate = first.sample_rate;

        for buffer in buffers {
            if buffer.sample_rate != sample_rate {
                return Err(NarrataError::sample_rate_mismatch(
                    sample_rate,
                    buffer.sample_rate,
                ));
            }
        }

        let total: usize = buffers.iter().map(AudioBuffer::len).sum();
        let mut samples = Vec::with_capacity(total);
        for buffer in buffers {
            samples.extend_from_slice(&buffer.samples);
        }

        self.normalize(&mut samples);

        debug!(
            "Assembled {} buffers into {} samples at {} Hz",
            buffers.len(),
            samples.len(),
            sample_rate
        );

        Ok(AudioBuffer {
            sample_rate,
            samples,
        })
    }

    /// Scale samples so the largest magnitude hits the target peak
    fn normalize(&self, samples: &mut [f32]) {
        let peak = if samples.len() >= PARALLEL_THRESHOLD {
            samples
                .par_iter()
                .map(|s| s.abs())
                .reduce(|| 0.0_f32, f32::max)
        } else {
            samples.iter().fold(0.0_f32, |acc, &s| acc.max(s.abs()))
        };

        if peak <= 0.0 {
            return;
        }

        let gain = self.target_peak / peak;
        if samples.len() >= PARALLEL_THRESHOLD {
            samples.par_iter_mut().for_each(|s| *s *= gain);
        } else {
            for s in samples.iter_mut() {
                *s *= gain;
            }
        }
    }
}

impl Default for AudioAssembler {
    fn default() -> Self {
        Self::new()
    }
}
