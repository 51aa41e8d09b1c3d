//! End-to-end document to audio-file orchestration.
//!
//! The pipeline ties segmentation, rendering and export together behind
//! one entry point. Each render is tagged with a job id so interleaved
//! log output stays attributable.

use crate::assembler::AudioBuffer;
use crate::error::{NarrataError, NarrataResult};
use crate::export::{AudioFormat, AudioWriter};
use crate::renderer::{RenderOptions, Renderer};
use crate::segmenter::{segment_html, segment_text};
use crate::synthesis::SynthesisPort;
use crate::token::Token;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Document to audio pipeline
#[derive(Clone)]
pub struct SpeechPipeline {
    synthesizer: Arc<dyn SynthesisPort>,
    renderer: Renderer,
    writer: AudioWriter,
}

impl SpeechPipeline {
    /// Create a pipeline around a synthesis backend
    #[must_use]
    pub fn new(synthesizer: Arc<dyn SynthesisPort>, options: RenderOptions) -> Self {
        Self {
            synthesizer,
            renderer: Renderer::with_options(options),
            writer: AudioWriter::new(),
        }
    }

    /// Replace the audio writer
    #[must_use]
    pub fn with_writer(mut self, writer: AudioWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Render an HTML document to a single audio buffer
    ///
    /// # Errors
    ///
    /// Returns [`NarrataError::NoContent`] when the document has no
    /// narratable text, plus any synthesis or assembly failure.
    pub async fn speak_document(&self, html: &str) -> NarrataResult<AudioBuffer> {
        self.render_tokens(segment_html(html)).await
    }

    /// Render marker-annotated plain text to a single audio buffer
    ///
    /// # Errors
    ///
    /// As [`SpeechPipeline::speak_document`].
    pub async fn speak_text(&self, text: &str) -> NarrataResult<AudioBuffer> {
        self.render_tokens(segment_text(text)).await
    }

    /// Render a markup file and write the result to disk
    ///
    /// `.txt` input is treated as marker-annotated text, anything else as
    /// HTML. Without an explicit output the audio lands next to the input
    /// with an `.m4b` extension; otherwise the output extension picks the
    /// format.
    ///
    /// # Errors
    ///
    /// As [`SpeechPipeline::speak_document`], plus export failures.
    pub async fn speak_markup_file(
        &self,
        input: &Path,
        output: Option<&Path>,
    ) -> NarrataResult<PathBuf> {
        let raw = std::fs::read_to_string(input)?;
        let audio = if is_marker_text(input) {
            self.speak_text(&raw).await?
        } else {
            self.speak_document(&raw).await?
        };

        let (path, format) = resolve_output(input, output);
        // Encoder subprocess and file writes stay off the async workers
        let writer = self.writer.clone();
        let out = path.clone();
        tokio::task::spawn_blocking(move || writer.write_file(&audio, &out, format))
            .await
            .map_err(|e| NarrataError::encoding(format!("Export task failed: {e}")))??;
        Ok(path)
    }

    /// Render every `*.html` file in a directory
    ///
    /// Output files are written as `.m4b` into `<dir>/audio/`. Files are
    /// processed in sorted name order and the first failure aborts the
    /// batch.
    ///
    /// # Errors
    ///
    /// As [`SpeechPipeline::speak_markup_file`].
    pub async fn speak_directory(&self, dir: &Path) -> NarrataResult<Vec<PathBuf>> {
        let pattern = format!("{}/*.html", dir.display());
        let mut files: Vec<_> = glob::glob(&pattern)
            .map_err(|e| NarrataError::configuration(format!("Invalid scan pattern: {e}")))?
            .filter_map(Result::ok)
            .collect();
        files.sort();

        if files.is_empty() {
            warn!("No .html files found in {}", dir.display());
            return Ok(Vec::new());
        }

        let out_dir = dir.join("audio");
        let mut written = Vec::with_capacity(files.len());
        for file in &files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let mut out = out_dir.join(name);
            out.set_extension(AudioFormat::M4b.extension());
            written.push(self.speak_markup_file(file, Some(&out)).await?);
        }
        Ok(written)
    }

    async fn render_tokens(&self, tokens: Vec<Token>) -> NarrataResult<AudioBuffer> {
        let job = Uuid::new_v4();
        info!("Job {job}: segmented input into {} token(s)", tokens.len());

        let audio = self
            .renderer
            .render(&tokens, self.synthesizer.as_ref())
            .await?;
        info!("Job {job}: rendered {:.1}s of audio", audio.duration_secs());
        Ok(audio)
    }
}

fn is_marker_text(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

fn resolve_output(input: &Path, output: Option<&Path>) -> (PathBuf, AudioFormat) {
    match output {
        Some(path) => (
            path.to_path_buf(),
            AudioFormat::from_path(path).unwrap_or(AudioFormat::M4b),
        ),
        None => (input.with_extension("m4b"), AudioFormat::M4b),
    }
}
