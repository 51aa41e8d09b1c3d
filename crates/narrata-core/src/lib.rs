//! # Narrata Core
//!
//! Document-to-speech pipeline that turns marked-up stories into narrated audio.
//!
//! ## Features
//!
//! - HTML and marker-text segmentation into speakable token sequences
//! - Style directives for voice changes and speed emphasis
//! - Ordered concurrent rendering against an HTTP synthesis backend
//! - Loudness-normalized assembly with inter-sentence pacing
//! - WAV, MP3 and M4B export plus podcast feed generation
//!
//! ## Example
//!
//! ```rust,no_run
//! use narrata_core::{HttpSynthesizer, RenderOptions, SpeechPipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let synthesizer = Arc::new(HttpSynthesizer::new("http://localhost:8880/synthesize")?);
//!     let pipeline = SpeechPipeline::new(synthesizer, RenderOptions::default());
//!
//!     let audio = pipeline.speak_document("<p>Hello world.</p>").await?;
//!     println!("Rendered {:.1}s of audio", audio.duration_secs());
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod assembler;
pub mod config;
pub mod error;
pub mod export;
pub mod feed;
pub mod fetcher;
pub mod pipeline;
pub mod queue;
pub mod renderer;
pub mod segmenter;
pub mod story;
pub mod synthesis;
pub mod token;
pub mod voice;

// Re-export main types for convenience
pub use assembler::{AudioAssembler, AudioBuffer};
pub use config::AppConfig;
pub use error::{NarrataError, NarrataResult};
pub use export::{AudioFormat, AudioWriter, EncodingSettings};
pub use feed::{build_feed, scan_audio_root, scan_story_dir, write_feed, Episode, FeedConfig};
pub use fetcher::{split_text_parts, ChapterResult, FetchConfig, StoryFetcher};
pub use pipeline::SpeechPipeline;
pub use queue::{
    download_story_parts, run_reading_job, HttpJobQueue, JobHandle, PollConfig, SpeechJobQueue,
    SynthesisJobRequest,
};
pub use renderer::{CancelToken, RenderOptions, RenderStep, Renderer};
pub use segmenter::{segment_document, segment_html, segment_text};
pub use story::{SourceKind, StoryRef};
pub use synthesis::{HttpSynthesizer, SynthesisPort};
pub use token::{BreakSize, StyleKind, Token};
pub use voice::VoiceCatalog;

/// Version information for the narrata-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default sample rate for rendered audio (24 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Default number of audio channels (mono)
pub const DEFAULT_CHANNELS: u16 = 1;

/// Default synthesis endpoint of a local TTS server
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8880/synthesize";

/// Default batch queue server for remote reading jobs
pub const DEFAULT_QUEUE_ENDPOINT: &str = "http://localhost:9000";

/// Default narration voice
pub const DEFAULT_VOICE: &str = "af_bella";

/// Voice used for cinematic passages such as headings
pub const CINEMATIC_VOICE: &str = "am_michael";

/// Speed multiplier applied to excited text
pub const EXCITED_SPEED_FACTOR: f32 = 1.2;

/// Peak level assembled audio is normalized to
pub const NORMALIZATION_PEAK: f32 = 0.95;

/// Maximum number of render steps per document
pub const MAX_RENDER_CHUNKS: usize = 100;

/// Default voice for remote batch synthesis
pub const DEFAULT_REMOTE_VOICE: &str = "Brian";

/// Sample rate of audio produced by the remote batch queue (Hz)
pub const QUEUE_SAMPLE_RATE: u32 = 22_050;

/// Maximum characters per text part submitted to the batch queue
pub const MAX_PART_CHARS: usize = 80_000;
