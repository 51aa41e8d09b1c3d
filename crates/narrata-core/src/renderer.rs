//! Token rendering into a single normalized waveform.
//!
//! Rendering runs in two phases. Planning folds the token sequence through
//! the directive state so overlapping breaks collapse and styles bind to
//! their text, producing an ordered list of [`RenderStep`]s. Execution then
//! synthesizes speech steps through the [`SynthesisPort`] and materializes
//! silence locally, before the assembler concatenates and normalizes the
//! result.

use crate::assembler::{AudioAssembler, AudioBuffer};
use crate::error::{NarrataError, NarrataResult};
use crate::synthesis::SynthesisPort;
use crate::token::{StyleKind, Token};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Rendering options with validated builder methods
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Default voice id for unstyled text
    pub voice: String,
    /// Base speech speed multiplier
    pub speed: f32,
    /// Sample rate used for locally generated silence
    pub sample_rate: u32,
    /// Maximum number of render steps before the plan is truncated
    pub max_chunks: usize,
    /// Concurrent synthesis calls; 1 is sequential, 0 picks the CPU count
    pub concurrency: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            voice: crate::DEFAULT_VOICE.to_string(),
            speed: 1.0,
            sample_rate: crate::DEFAULT_SAMPLE_RATE,
            max_chunks: crate::MAX_RENDER_CHUNKS,
            concurrency: 1,
        }
    }
}

impl RenderOptions {
    /// Create options with the default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default voice
    ///
    /// # Errors
    ///
    /// Returns an error if the voice id is empty.
    pub fn with_voice(mut self, voice: impl Into<String>) -> NarrataResult<Self> {
        let voice = voice.into();
        if voice.trim().is_empty() {
            return Err(NarrataError::invalid_input("Voice id cannot be empty"));
        }
        self.voice = voice;
        Ok(self)
    }

    /// Set the base speech speed
    ///
    /// # Errors
    ///
    /// Returns an error if the speed is outside 0.1..=3.0.
    pub fn with_speed(mut self, speed: f32) -> NarrataResult<Self> {
        if !(0.1..=3.0).contains(&speed) {
            return Err(NarrataError::invalid_input(format!(
                "Speed must be between 0.1 and 3.0, got {speed}"
            )));
        }
        self.speed = speed;
        Ok(self)
    }

    /// Set the silence sample rate
    ///
    /// # Errors
    ///
    /// Returns an error if the rate is outside 8000..=192000 Hz.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> NarrataResult<Self> {
        if !(8000..=192_000).contains(&sample_rate) {
            return Err(NarrataError::invalid_input(format!(
                "Sample rate must be between 8000 and 192000 Hz, got {sample_rate}"
            )));
        }
        self.sample_rate = sample_rate;
        Ok(self)
    }

    /// Set the render plan step cap
    ///
    /// # Errors
    ///
    /// Returns an error if the cap is zero.
    pub fn with_max_chunks(mut self, max_chunks: usize) -> NarrataResult<Self> {
        if max_chunks == 0 {
            return Err(NarrataError::invalid_input(
                "Chunk cap must be at least 1",
            ));
        }
        self.max_chunks = max_chunks;
        Ok(self)
    }

    /// Set the synthesis concurrency (0 selects the CPU count)
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Number of synthesis workers after resolving the auto setting
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            num_cpus::get().max(1)
        } else {
            self.concurrency
        }
    }
}

/// Cooperative cancellation flag shared between a render and its caller
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the render holding this token
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One planned unit of output audio
#[derive(Debug, Clone, PartialEq)]
pub enum RenderStep {
    /// Synthesize text with a resolved voice and speed
    Speak {
        /// Position of this step in the plan
        index: usize,
        /// Plain text to synthesize
        text: String,
        /// Resolved voice id
        voice: String,
        /// Resolved speed multiplier
        speed: f32,
    },
    /// Insert locally generated silence
    Silence {
        /// Position of this step in the plan
        index: usize,
        /// Silence duration in seconds
        duration: f32,
    },
}

/// Tracks the directive effects that carry between tokens during planning
#[derive(Debug, Default)]
struct DirectiveState {
    pending_break: f32,
    pending_style: Option<StyleKind>,
}

/// Renders token sequences into normalized audio
#[derive(Debug, Clone)]
pub struct Renderer {
    options: RenderOptions,
    assembler: AudioAssembler,
}

impl Renderer {
    /// Create a renderer with default options
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(RenderOptions::default())
    }

    /// Create a renderer with the given options
    #[must_use]
    pub fn with_options(options: RenderOptions) -> Self {
        Self {
            options,
            assembler: AudioAssembler::new(),
        }
    }

    /// Options this renderer was built with
    #[must_use]
    pub const fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Fold tokens into an ordered render plan
    ///
    /// Consecutive breaks collapse: each break contributes only the
    /// difference between its duration and the silence already pending,
    /// and fully absorbed breaks disappear. A pending style resolves the
    /// voice and speed of exactly the next speech step. Plans longer than
    /// the configured cap are truncated with a warning.
    #[must_use]
    pub fn plan(&self, tokens: &[Token]) -> Vec<RenderStep> {
        let mut steps = Vec::new();
        let mut state = DirectiveState::default();

        for token in tokens {
            match token {
                Token::Break(size) => {
                    let requested = size.duration_secs();
                    let effective = (requested - state.pending_break).max(0.0);
                    state.pending_break = requested;
                    if effective > 0.0 {
                        steps.push(RenderStep::Silence {
                            index: steps.len(),
                            duration: effective,
                        });
                    }
                }
                Token::StyleStart(kind) => {
                    state.pending_style = Some(*kind);
                }
                Token::Text(text) => {
                    let (voice, speed) = match state.pending_style.take() {
                        Some(StyleKind::Cinematic) => {
                            (crate::CINEMATIC_VOICE.to_string(), self.options.speed)
                        }
                        Some(StyleKind::Excited) => (
                            self.options.voice.clone(),
                            self.options.speed * crate::EXCITED_SPEED_FACTOR,
                        ),
                        None => (self.options.voice.clone(), self.options.speed),
                    };
                    state.pending_break = 0.0;
                    steps.push(RenderStep::Speak {
                        index: steps.len(),
                        text: text.clone(),
                        voice,
                        speed,
                    });
                }
            }
        }

        if steps.len() > self.options.max_chunks {
            warn!(
                "Render plan has {} steps, truncating to {}",
                steps.len(),
                self.options.max_chunks
            );
            steps.truncate(self.options.max_chunks);
        }

        steps
    }

    /// Render tokens into a single normalized buffer
    ///
    /// # Errors
    ///
    /// Returns [`NarrataError::NoContent`] for an empty plan,
    /// [`NarrataError::SynthesisUnavailable`] when the backend fails, and
    /// [`NarrataError::SampleRateMismatch`] when backend audio disagrees
    /// with the configured silence sample rate.
    pub async fn render(
        &self,
        tokens: &[Token],
        synthesizer: &dyn SynthesisPort,
    ) -> NarrataResult<AudioBuffer> {
        self.render_with_cancel(tokens, synthesizer, &CancelToken::new())
            .await
    }

    /// Render tokens, aborting when the token is cancelled
    ///
    /// The flag is checked after every synthesis call; a cancelled render
    /// discards all partial audio.
    ///
    /// # Errors
    ///
    /// As [`Renderer::render`], plus [`NarrataError::Cancelled`] when the
    /// token fires.
    pub async fn render_with_cancel(
        &self,
        tokens: &[Token],
        synthesizer: &dyn SynthesisPort,
        cancel: &CancelToken,
    ) -> NarrataResult<AudioBuffer> {
        let steps = self.plan(tokens);
        if steps.is_empty() {
            return Err(NarrataError::NoContent);
        }

        if cancel.is_cancelled() {
            return Err(NarrataError::Cancelled);
        }

        let workers = self.options.effective_concurrency();
        info!(
            "Rendering {} tokens as {} steps with {} worker(s)",
            tokens.len(),
            steps.len(),
            workers
        );

        let total = steps.len();
        let mut step_stream = futures::stream::iter(
            steps
                .iter()
                .map(|step| self.execute_step(step, total, synthesizer)),
        )
        .buffered(workers);

        let mut buffers = Vec::new();
        while let Some(result) = step_stream.next().await {
            let mut segments = result?;
            buffers.append(&mut segments);
            if cancel.is_cancelled() {
                return Err(NarrataError::Cancelled);
            }
        }

        let output = self.assembler.assemble(&buffers)?;
        info!("Rendered {:.2}s of audio", output.duration_secs());
        Ok(output)
    }

    async fn execute_step(
        &self,
        step: &RenderStep,
        total: usize,
        synthesizer: &dyn SynthesisPort,
    ) -> NarrataResult<Vec<AudioBuffer>> {
        match step {
            RenderStep::Speak {
                index,
                text,
                voice,
                speed,
            } => {
                debug!(
                    "Synthesizing step {}/{} ({} chars, voice {})",
                    index + 1,
                    total,
                    text.len(),
                    voice
                );
                synthesizer.synthesize(text, voice, *speed).await
            }
            RenderStep::Silence { index, duration } => {
                debug!("Inserting {:.2}s silence at step {}/{}", duration, index + 1, total);
                Ok(vec![AudioBuffer::silence(
                    *duration,
                    self.options.sample_rate,
                )])
            }
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
