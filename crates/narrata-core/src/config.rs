//! Application configuration loaded from TOML.
//!
//! Every field has a default, so a missing or partial file always yields
//! a usable configuration. Lookup order for [`AppConfig::load_or_default`]
//! is an explicit path, then the `NARRATA_CONFIG` environment variable,
//! then the platform config directory.

use crate::error::{NarrataError, NarrataResult};
use crate::export::EncodingSettings;
use crate::feed::FeedConfig;
use crate::fetcher::FetchConfig;
use crate::queue::PollConfig;
use crate::renderer::RenderOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_ENV_VAR: &str = "NARRATA_CONFIG";
const CONFIG_FILE_NAME: &str = "narrata.toml";

/// Top-level application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Local synthesis voice
    pub voice: String,
    /// Speech rate multiplier
    pub speed: f32,
    /// Local synthesis endpoint
    pub endpoint: String,
    /// Remote batch queue server
    pub queue_url: String,
    /// Render sample rate in Hz
    pub sample_rate: u32,
    /// Concurrent render workers
    pub jobs: usize,
    /// Base directory for fetched and rendered output
    pub output_dir: PathBuf,
    /// Voice for remote batch jobs
    pub remote_voice: String,
    /// Story fetcher settings
    pub fetch: FetchConfig,
    /// Batch queue polling schedule
    pub poll: PollConfig,
    /// Podcast feed settings
    pub feed: FeedConfig,
    /// Audio export settings
    pub encoding: EncodingSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            voice: crate::DEFAULT_VOICE.to_string(),
            speed: 1.0,
            endpoint: crate::DEFAULT_ENDPOINT.to_string(),
            queue_url: crate::DEFAULT_QUEUE_ENDPOINT.to_string(),
            sample_rate: crate::DEFAULT_SAMPLE_RATE,
            jobs: 1,
            output_dir: PathBuf::from("."),
            remote_voice: crate::DEFAULT_REMOTE_VOICE.to_string(),
            fetch: FetchConfig::default(),
            poll: PollConfig::default(),
            feed: FeedConfig::default(),
            encoding: EncodingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`NarrataError::FileError`] if the file cannot be read and
    /// [`NarrataError::ConfigurationError`] if it does not parse.
    pub fn load(path: &Path) -> NarrataResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw).map_err(|e| {
            NarrataError::configuration(format!("Invalid config file '{}': {e}", path.display()))
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve configuration from the usual places
    ///
    /// An explicit path is always honored and missing files there are an
    /// error. Otherwise the `NARRATA_CONFIG` environment variable is
    /// consulted, then `narrata.toml` in the platform config directory.
    /// When nothing is found the defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error when a named file exists but cannot be read or
    /// parsed.
    pub fn load_or_default(explicit: Option<&Path>) -> NarrataResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Self::load(Path::new(&path));
            }
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "narrata") {
            let path = dirs.config_dir().join(CONFIG_FILE_NAME);
            if path.is_file() {
                return Self::load(&path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Render options for this configuration
    ///
    /// # Errors
    ///
    /// Returns [`NarrataError::InvalidInput`] when a value is out of
    /// range, for example a speed outside 0.1..=3.0.
    pub fn render_options(&self) -> NarrataResult<RenderOptions> {
        Ok(RenderOptions::new()
            .with_voice(self.voice.clone())?
            .with_speed(self.speed)?
            .with_sample_rate(self.sample_rate)?
            .with_concurrency(self.jobs))
    }
}
