//! Command-line narrator built on narrata-core.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use narrata_core::{
    build_feed, download_story_parts, run_reading_job, scan_audio_root, write_feed, AppConfig,
    AudioWriter, HttpJobQueue, HttpSynthesizer, NarrataError, SpeechPipeline, StoryFetcher,
    StoryRef, VoiceCatalog, DEFAULT_REMOTE_VOICE,
};

/// Exit code for general failures
const FAILURE_EXIT: u8 = 1;

/// Exit code for inputs that contain nothing to narrate
const NO_CONTENT_EXIT: u8 = 2;

/// Narrata - turn marked-up stories into narrated audio
#[derive(Parser)]
#[command(name = "narrata", version, about)]
struct Cli {
    /// Path to a configuration file
    #[arg(short, long, env = "NARRATA_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Narrate a markup file or a directory of HTML files
    Speak {
        /// Input .html or .txt file, or a directory of .html files
        input: PathBuf,

        /// Output audio file; derived from the input when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Narration voice
        #[arg(long)]
        voice: Option<String>,

        /// Speech speed multiplier
        #[arg(long)]
        speed: Option<f32>,

        /// Concurrent synthesis requests (0 uses all cores)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Synthesis server endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Fetch story chapters as HTML for later narration
    Fetch {
        /// Chapter references, or a single .toml story definition
        #[arg(required = true)]
        refs: Vec<String>,

        /// Directory the html/ tree is created under
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Read stories through the remote batch queue
    Read {
        /// Chapter references of one story, or a directory of .txt stories
        #[arg(required = true)]
        refs: Vec<String>,

        /// Batch voice for synthesis
        #[arg(long)]
        voice: Option<String>,

        /// Submit synthesis jobs; without this only finished audio is downloaded
        #[arg(long)]
        run: bool,

        /// Directory the audio/ tree is created under
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Queue server URL
        #[arg(long)]
        queue_url: Option<String>,
    },
    /// Generate a podcast feed for rendered story audio
    Feed {
        /// Audio root directory to scan
        #[arg(default_value = "audio")]
        audio_dir: PathBuf,

        /// Feed file to write
        #[arg(short, long, default_value = "feed.xml")]
        output: PathBuf,

        /// Feed title
        #[arg(long)]
        title: Option<String>,

        /// Base URL the audio files are served under
        #[arg(long)]
        base_url: Option<String>,
    },
    /// List the voices available for batch reading
    Voices,
}

/// Story definition file for multi-chapter fetches
#[derive(Debug, Deserialize)]
struct StoryDef {
    refs: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Map a failure to the process exit code
fn exit_code_for(error: &anyhow::Error) -> u8 {
    if matches!(
        error.downcast_ref::<NarrataError>(),
        Some(NarrataError::NoContent)
    ) {
        NO_CONTENT_EXIT
    } else {
        FAILURE_EXIT
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Speak {
            input,
            output,
            voice,
            speed,
            jobs,
            endpoint,
        } => cmd_speak(config, &input, output.as_deref(), voice, speed, jobs, endpoint).await,
        Command::Fetch { refs, out_dir } => cmd_fetch(config, &refs, &out_dir).await,
        Command::Read {
            refs,
            voice,
            run,
            out_dir,
            queue_url,
        } => cmd_read(config, &refs, voice, run, &out_dir, queue_url).await,
        Command::Feed {
            audio_dir,
            output,
            title,
            base_url,
        } => cmd_feed(&config, &audio_dir, &output, title, base_url),
        Command::Voices => cmd_voices(),
    }
}

async fn cmd_speak(
    mut config: AppConfig,
    input: &Path,
    output: Option<&Path>,
    voice: Option<String>,
    speed: Option<f32>,
    jobs: Option<usize>,
    endpoint: Option<String>,
) -> anyhow::Result<()> {
    if let Some(voice) = voice {
        config.voice = voice;
    }
    if let Some(speed) = speed {
        config.speed = speed;
    }
    if let Some(jobs) = jobs {
        config.jobs = jobs;
    }
    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint;
    }

    let options = config.render_options()?;
    let synthesizer = Arc::new(HttpSynthesizer::new(config.endpoint.clone())?);
    let pipeline = SpeechPipeline::new(synthesizer, options)
        .with_writer(AudioWriter::with_settings(config.encoding.clone()));

    if input.is_dir() {
        anyhow::ensure!(
            output.is_none(),
            "--output cannot be combined with a directory input"
        );
        let written = pipeline.speak_directory(input).await?;
        for path in &written {
            println!("{}", path.display());
        }
        println!(
            "Narrated {} file(s) into {}",
            written.len(),
            input.join("audio").display()
        );
    } else {
        let written = pipeline.speak_markup_file(input, output).await?;
        println!("{}", written.display());
    }
    Ok(())
}

async fn cmd_fetch(config: AppConfig, refs: &[String], out_dir: &Path) -> anyhow::Result<()> {
    let story = resolve_story(refs)?;
    let path = story.html_path(out_dir);
    if path.exists() {
        println!("{} already fetched, skipping", path.display());
        return Ok(());
    }

    let fetcher = StoryFetcher::new(config.fetch.clone())?;
    let chapters = fetcher.fetch_story_html(&story).await;

    let mut html = String::new();
    let mut fetched = 0;
    for chapter in &chapters {
        if let Ok(body) = &chapter.html {
            html.push_str(body);
            fetched += 1;
        }
    }
    anyhow::ensure!(fetched > 0, "No chapters could be fetched for '{story}'");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, html)?;
    println!(
        "Fetched {fetched} of {} chapter(s) to {}",
        chapters.len(),
        path.display()
    );
    Ok(())
}

async fn cmd_read(
    config: AppConfig,
    refs: &[String],
    voice: Option<String>,
    run: bool,
    out_dir: &Path,
    queue_url: Option<String>,
) -> anyhow::Result<()> {
    let stories = resolve_read_targets(refs)?;
    let queue = HttpJobQueue::new(queue_url.unwrap_or_else(|| config.queue_url.clone()))?;
    let catalog = VoiceCatalog::new();
    let voice = voice.unwrap_or_else(|| config.remote_voice.clone());

    for story in &stories {
        let outcome = if run {
            let fetcher = StoryFetcher::new(config.fetch.clone())?;
            let parts = fetcher.fetch_story_text(story).await?;
            println!("Submitting {} part(s) of '{story}'", parts.len());
            run_reading_job(&queue, story, &parts, &voice, &catalog, &config.poll, out_dir).await
        } else {
            download_story_parts(&queue, story, 0, &config.poll, out_dir).await
        };

        match outcome {
            Ok(files) => {
                for file in &files {
                    println!("{}", file.display());
                }
                println!("Saved {} part(s) of '{story}'", files.len());
            }
            Err(NarrataError::TimeoutError { message }) => {
                println!(
                    "'{story}' is not ready yet; re-run without --run later to download finished audio"
                );
                anyhow::bail!(message);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn cmd_feed(
    config: &AppConfig,
    audio_dir: &Path,
    output: &Path,
    title: Option<String>,
    base_url: Option<String>,
) -> anyhow::Result<()> {
    let mut feed_config = config.feed.clone();
    if let Some(title) = title {
        feed_config = feed_config.with_title(title)?;
    }
    if let Some(base_url) = base_url {
        feed_config = feed_config.with_base_audio_url(base_url)?;
    }

    let episodes = scan_audio_root(audio_dir, &feed_config.base_audio_url)?;
    let channel = build_feed(&feed_config, &episodes);
    write_feed(&channel, output)?;
    println!(
        "Wrote {} episode(s) to {}",
        episodes.len(),
        output.display()
    );
    Ok(())
}

fn cmd_voices() -> anyhow::Result<()> {
    let catalog = VoiceCatalog::new();
    println!("Available batch voices:");
    for voice in catalog.available_voices() {
        let language = catalog.language_for(voice)?;
        let marker = if voice == DEFAULT_REMOTE_VOICE {
            "  (default)"
        } else {
            ""
        };
        println!("  {voice:<10} {language}{marker}");
    }
    Ok(())
}

/// Turn fetch arguments into a story: either direct refs or a definition file
fn resolve_story(refs: &[String]) -> anyhow::Result<StoryRef> {
    if let [only] = refs {
        if only.ends_with(".toml") {
            let raw = std::fs::read_to_string(only)?;
            let def: StoryDef = toml::from_str(&raw)?;
            return Ok(StoryRef::from_refs(def.refs)?);
        }
    }
    Ok(StoryRef::from_refs(refs.to_vec())?)
}

/// Turn read arguments into stories: one story from refs, or one per .txt in a directory
fn resolve_read_targets(refs: &[String]) -> anyhow::Result<Vec<StoryRef>> {
    if let [only] = refs {
        let path = Path::new(only);
        if path.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(path)? {
                let entry = entry?;
                let file = entry.path();
                if file.extension().is_some_and(|ext| ext == "txt") {
                    files.push(file);
                }
            }
            files.sort();
            anyhow::ensure!(!files.is_empty(), "No .txt stories found in '{only}'");
            return Ok(files
                .iter()
                .map(|file| StoryRef::new(file.display().to_string()))
                .collect());
        }
    }
    Ok(vec![StoryRef::from_refs(refs.to_vec())?])
}
