//! Integration tests for narrata-core crate

use async_trait::async_trait;
use narrata_core::{
    segment_html, AudioBuffer, BreakSize, NarrataError, NarrataResult, RenderOptions, Renderer,
    SpeechPipeline, StyleKind, SynthesisPort, Token,
};
use std::sync::{Arc, Mutex};

/// Deterministic synthesis stand-in producing fixed-amplitude audio
struct ToneSynthesizer {
    sample_rate: u32,
    amplitude: f32,
}

impl ToneSynthesizer {
    fn new(sample_rate: u32, amplitude: f32) -> Self {
        Self {
            sample_rate,
            amplitude,
        }
    }
}

#[async_trait]
impl SynthesisPort for ToneSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        _voice: &str,
        _speed: f32,
    ) -> NarrataResult<Vec<AudioBuffer>> {
        // 100 samples per character keeps durations text-dependent but small
        let samples = vec![self.amplitude; text.len() * 100];
        Ok(vec![AudioBuffer::new(self.sample_rate, samples)])
    }
}

/// Synthesis stand-in that records every call it receives
struct RecordingSynthesizer {
    calls: Mutex<Vec<(String, String, f32)>>,
}

impl RecordingSynthesizer {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, String, f32)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SynthesisPort for RecordingSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
    ) -> NarrataResult<Vec<AudioBuffer>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((text.to_string(), voice.to_string(), speed));
        }
        Ok(vec![AudioBuffer::new(24000, vec![0.25; 500])])
    }
}

fn tone_pipeline(amplitude: f32) -> SpeechPipeline {
    SpeechPipeline::new(
        Arc::new(ToneSynthesizer::new(24000, amplitude)),
        RenderOptions::default(),
    )
}

#[test]
fn test_paragraphs_become_sentences_and_breaks() {
    let tokens = segment_html("<p>One. Two.</p><p>Three.</p>");

    let sentences: Vec<_> = tokens
        .iter()
        .filter_map(Token::as_text)
        .collect();
    assert_eq!(sentences, vec!["One.", "Two.", "Three."]);

    let small_breaks = tokens
        .iter()
        .filter(|token| matches!(token, Token::Break(BreakSize::Small)))
        .count();
    assert_eq!(small_breaks, 2);
}

#[test]
fn test_heading_document_token_sequence() {
    let tokens = segment_html("<h1>Intro</h1><p>Hello world.</p>");
    assert_eq!(
        tokens,
        vec![
            Token::StyleStart(StyleKind::Cinematic),
            Token::Text("Intro".to_string()),
            Token::Break(BreakSize::Medium),
            Token::Text("Hello world.".to_string()),
            Token::Break(BreakSize::Small),
        ]
    );
}

#[test]
fn test_inline_emphasis_token_sequence() {
    let tokens = segment_html("<em>Wow!</em> Nice.");
    assert_eq!(
        tokens,
        vec![
            Token::StyleStart(StyleKind::Excited),
            Token::Text("Wow!".to_string()),
            Token::Break(BreakSize::Tiny),
            Token::Text("Nice.".to_string()),
        ]
    );
}

#[test]
fn test_segmentation_is_idempotent() {
    let html = "<h1>Intro</h1><p>Hello there. General remark!</p><div><p>Nested.</p></div>";
    let first = segment_html(html);
    let second = segment_html(html);
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn test_consecutive_breaks_add_no_silence_to_plan() {
    let renderer = Renderer::new();

    let with_extra_break = renderer.plan(&[
        Token::Text("One.".to_string()),
        Token::Break(BreakSize::Medium),
        Token::Break(BreakSize::Tiny),
        Token::Text("Two.".to_string()),
    ]);
    let without = renderer.plan(&[
        Token::Text("One.".to_string()),
        Token::Break(BreakSize::Medium),
        Token::Text("Two.".to_string()),
    ]);

    assert_eq!(with_extra_break, without);
}

#[tokio::test]
async fn test_consecutive_breaks_render_same_duration() {
    let pipeline = tone_pipeline(0.4);

    let longer = pipeline
        .speak_text("One. [break=medium] [break=tiny] Two.")
        .await
        .expect("Should render");
    let baseline = pipeline
        .speak_text("One. [break=medium] Two.")
        .await
        .expect("Should render");

    assert_eq!(longer.len(), baseline.len());
}

#[tokio::test]
async fn test_rendered_audio_is_normalized() {
    let audio = tone_pipeline(0.4)
        .speak_document("<p>Hello world.</p>")
        .await
        .expect("Should render");

    assert!(!audio.is_empty());
    assert!((audio.peak() - 0.95).abs() < 1e-3);
    assert!(audio.samples.iter().all(|s| s.abs() <= 1.0));
}

#[tokio::test]
async fn test_all_silent_audio_stays_silent() {
    let audio = tone_pipeline(0.0)
        .speak_document("<p>Hello world.</p>")
        .await
        .expect("Should render");

    assert!(!audio.is_empty());
    assert_eq!(audio.peak(), 0.0);
    assert!(audio.samples.iter().all(|&s| s == 0.0));
}

#[tokio::test]
async fn test_empty_document_renders_as_no_content() {
    let tokens = segment_html("<div></div>");
    assert!(tokens.is_empty());

    let result = tone_pipeline(0.4).speak_document("<div></div>").await;
    assert!(matches!(result, Err(NarrataError::NoContent)));
}

#[tokio::test]
async fn test_mixed_sample_rates_fail_assembly() {
    let pipeline = SpeechPipeline::new(
        Arc::new(ToneSynthesizer::new(22050, 0.4)),
        RenderOptions::default(),
    );

    // Backend speech at 22050 Hz meets generated silence at 24000 Hz
    let result = pipeline.speak_document("<p>One.</p><p>Two.</p>").await;
    match result {
        Err(NarrataError::SampleRateMismatch { expected, found }) => {
            assert_eq!(expected, 22050);
            assert_eq!(found, 24000);
        }
        other => panic!("Expected SampleRateMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_style_reverts_after_one_sentence() {
    let recorder = Arc::new(RecordingSynthesizer::new());
    let pipeline = SpeechPipeline::new(recorder.clone(), RenderOptions::default());

    pipeline
        .speak_document("<h1>Intro</h1><p>One. Two.</p>")
        .await
        .expect("Should render");

    let calls = recorder.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].0, "Intro");
    assert_eq!(calls[0].1, "am_michael");
    assert_eq!(calls[1].0, "One.");
    assert_eq!(calls[1].1, "af_bella");
    assert_eq!(calls[2].0, "Two.");
    assert_eq!(calls[2].1, "af_bella");
}

#[tokio::test]
async fn test_excited_style_speeds_up_one_sentence() {
    let recorder = Arc::new(RecordingSynthesizer::new());
    let pipeline = SpeechPipeline::new(recorder.clone(), RenderOptions::default());

    pipeline
        .speak_document("<p><em>Wow!</em> Nice.</p>")
        .await
        .expect("Should render");

    let calls = recorder.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "Wow!");
    assert!((calls[0].2 - 1.2).abs() < f32::EPSILON);
    assert_eq!(calls[1].0, "Nice.");
    assert!((calls[1].2 - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_marker_text_switches_voice() {
    let recorder = Arc::new(RecordingSynthesizer::new());
    let pipeline = SpeechPipeline::new(recorder.clone(), RenderOptions::default());

    pipeline
        .speak_text("First part. [break=large] [cinematic] Second part.")
        .await
        .expect("Should render");

    let calls = recorder.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], ("First part.".to_string(), "af_bella".to_string(), 1.0));
    assert_eq!(
        calls[1],
        ("Second part.".to_string(), "am_michael".to_string(), 1.0)
    );
}

#[tokio::test]
async fn test_concurrent_render_matches_sequential() {
    let html = "<h1>Intro</h1><p>One. Two. Three.</p><p>Four.</p>";

    let sequential = tone_pipeline(0.4)
        .speak_document(html)
        .await
        .expect("Should render");
    let concurrent = SpeechPipeline::new(
        Arc::new(ToneSynthesizer::new(24000, 0.4)),
        RenderOptions::default().with_concurrency(4),
    )
    .speak_document(html)
    .await
    .expect("Should render");

    assert_eq!(sequential.sample_rate, concurrent.sample_rate);
    assert_eq!(sequential.samples, concurrent.samples);
}

#[tokio::test]
async fn test_markup_file_to_wav_on_disk() {
    let temp = tempfile::tempdir().expect("Should create temp dir");
    let input = temp.path().join("story.html");
    std::fs::write(&input, "<h1>Intro</h1><p>Hello world.</p>").expect("Should write input");
    let output = temp.path().join("story.wav");

    let written = tone_pipeline(0.4)
        .speak_markup_file(&input, Some(&output))
        .await
        .expect("Should render and write");

    assert_eq!(written, output);
    let reader = hound::WavReader::open(&output).expect("Output should be a WAV file");
    assert_eq!(reader.spec().sample_rate, 24000);
    assert_eq!(reader.spec().channels, 1);
    assert!(reader.duration() > 0);
}
