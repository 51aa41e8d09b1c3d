//! Batch speech jobs against a remote synthesis queue.
//!
//! The queue flow is submit, poll, fetch: every text part becomes one job
//! under the story's key prefix, completion is observed by listing the
//! prefix until all parts exist, and finished objects are fetched into the
//! story's audio directory. Queue backends produce mp3 at 22050 Hz.
//!
//! [`HttpJobQueue`] talks to a queue server over a small REST surface:
//! `POST /jobs` submits, `GET /objects?prefix=` lists finished keys and
//! `GET /objects/<key>` downloads one object.

use crate::error::{NarrataError, NarrataResult};
use crate::story::StoryRef;
use crate::voice::VoiceCatalog;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

/// Default request timeout for HTTP queue backends
const QUEUE_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// One batch synthesis job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisJobRequest {
    /// Plain text of this part
    pub text: String,
    /// Remote voice id
    pub voice_id: String,
    /// Language code matching the voice
    pub language_code: String,
    /// Output container format
    pub output_format: String,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Object key the backend writes under
    pub output_key: String,
}

impl SynthesisJobRequest {
    /// Create an mp3 job at the queue sample rate
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        voice_id: impl Into<String>,
        language_code: impl Into<String>,
        output_key: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            voice_id: voice_id.into(),
            language_code: language_code.into(),
            output_format: "mp3".to_string(),
            sample_rate: crate::QUEUE_SAMPLE_RATE,
            output_key: output_key.into(),
        }
    }
}

/// Identifier of an accepted job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Backend-assigned job id
    pub job_id: String,
    /// Object key the job writes to
    pub output_key: String,
}

/// Polling schedule for job completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between completion checks
    pub interval_secs: u64,
    /// Number of checks before giving up
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_attempts: 30,
        }
    }
}

impl PollConfig {
    /// Create the default schedule
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the poll interval
    ///
    /// # Errors
    ///
    /// Returns an error if the interval is zero.
    pub fn with_interval_secs(mut self, interval_secs: u64) -> NarrataResult<Self> {
        if interval_secs == 0 {
            return Err(NarrataError::configuration(
                "Poll interval must be at least 1 second",
            ));
        }
        self.interval_secs = interval_secs;
        Ok(self)
    }

    /// Set the attempt bound
    ///
    /// # Errors
    ///
    /// Returns an error if the bound is zero.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> NarrataResult<Self> {
        if max_attempts == 0 {
            return Err(NarrataError::configuration(
                "Poll attempts must be at least 1",
            ));
        }
        self.max_attempts = max_attempts;
        Ok(self)
    }

    /// Poll interval as a duration
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Remote batch synthesis queue boundary
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechJobQueue: Send + Sync {
    /// Submit one part for synthesis
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the job.
    async fn submit(&self, request: &SynthesisJobRequest) -> NarrataResult<JobHandle>;

    /// List finished object keys under a prefix
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    async fn list_completed(&self, key_prefix: &str) -> NarrataResult<Vec<String>>;

    /// Fetch one finished object to a local path
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be retrieved.
    async fn fetch(&self, key: &str, dest: &Path) -> NarrataResult<PathBuf>;
}

#[derive(Debug, Deserialize)]
struct JobSubmitResponse {
    job_id: String,
}

/// Queue client speaking to a batch synthesis server over HTTP
#[derive(Debug, Clone)]
pub struct HttpJobQueue {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJobQueue {
    /// Create a queue client for the given server
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>) -> NarrataResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(QUEUE_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Server URL this client talks to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SpeechJobQueue for HttpJobQueue {
    async fn submit(&self, request: &SynthesisJobRequest) -> NarrataResult<JobHandle> {
        let response = self
            .client
            .post(format!("{}/jobs", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| NarrataError::network(format!("Queue submit failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NarrataError::network(format!(
                "Queue returned {status} for job submit"
            )));
        }

        let accepted: JobSubmitResponse = response
            .json()
            .await
            .map_err(|e| NarrataError::network(format!("Invalid queue response: {e}")))?;
        Ok(JobHandle {
            job_id: accepted.job_id,
            output_key: request.output_key.clone(),
        })
    }

    async fn list_completed(&self, key_prefix: &str) -> NarrataResult<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/objects", self.base_url))
            .query(&[("prefix", key_prefix)])
            .send()
            .await
            .map_err(|e| NarrataError::network(format!("Queue listing failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NarrataError::network(format!(
                "Queue returned {status} for listing '{key_prefix}'"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| NarrataError::network(format!("Invalid queue listing: {e}")))
    }

    async fn fetch(&self, key: &str, dest: &Path) -> NarrataResult<PathBuf> {
        let response = self
            .client
            .get(format!("{}/objects/{key}", self.base_url))
            .send()
            .await
            .map_err(|e| NarrataError::network(format!("Object fetch failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NarrataError::network(format!(
                "Queue returned {status} for object '{key}'"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NarrataError::network(format!("Failed to read object '{key}': {e}")))?;
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(dest, &bytes)?;
        Ok(dest.to_path_buf())
    }
}

/// Submit a story's parts, wait for completion and fetch the audio
///
/// The voice is validated against the catalog before anything is
/// submitted. Poll exhaustion leaves the submitted jobs running; the
/// caller may retry with [`download_story_parts`] once they finish.
///
/// # Errors
///
/// Returns [`NarrataError::VoiceNotFound`] for an unknown voice,
/// [`NarrataError::TimeoutError`] when polling is exhausted, and any
/// submit or fetch failure from the queue.
pub async fn run_reading_job(
    queue: &dyn SpeechJobQueue,
    story: &StoryRef,
    parts: &[String],
    voice: &str,
    catalog: &VoiceCatalog,
    poll: &PollConfig,
    base_dir: &Path,
) -> NarrataResult<Vec<PathBuf>> {
    let language = catalog.language_for(voice)?;

    if parts.is_empty() {
        return Err(NarrataError::EmptyInput);
    }

    info!(
        "Submitting {} part(s) of '{}' with voice {} ({})",
        parts.len(),
        story,
        voice,
        language
    );
    for (index, part) in parts.iter().enumerate() {
        let request = SynthesisJobRequest::new(
            part.clone(),
            voice,
            language,
            story.remote_part_key(index + 1),
        );
        let handle = queue.submit(&request).await?;
        debug!(
            "Part {} accepted as job {} ({} chars)",
            index + 1,
            handle.job_id,
            part.len()
        );
    }

    download_story_parts(queue, story, parts.len(), poll, base_dir).await
}

/// Poll for a story's finished parts and fetch them into its audio dir
///
/// With `expected_parts` of zero the story is considered ready as soon as
/// any object exists under its prefix, which covers re-running the
/// download after an earlier timeout.
///
/// # Errors
///
/// Returns [`NarrataError::TimeoutError`] when the parts never show up
/// within the polling schedule.
pub async fn download_story_parts(
    queue: &dyn SpeechJobQueue,
    story: &StoryRef,
    expected_parts: usize,
    poll: &PollConfig,
    base_dir: &Path,
) -> NarrataResult<Vec<PathBuf>> {
    let prefix = format!("{}/", story.remote_base_key());
    let required = expected_parts.max(1);

    for attempt in 1..=poll.max_attempts {
        let mut completed = queue.list_completed(&prefix).await?;
        if completed.len() >= required {
            completed.sort_unstable();
            return fetch_all(queue, story, &completed, base_dir).await;
        }

        debug!(
            "Poll {}/{}: {} of {} part(s) ready for '{}'",
            attempt,
            poll.max_attempts,
            completed.len(),
            required,
            story
        );
        if attempt < poll.max_attempts {
            tokio::time::sleep(poll.interval()).await;
        }
    }

    Err(NarrataError::timeout(format!(
        "Story '{story}' not ready after {} poll attempts",
        poll.max_attempts
    )))
}

async fn fetch_all(
    queue: &dyn SpeechJobQueue,
    story: &StoryRef,
    keys: &[String],
    base_dir: &Path,
) -> NarrataResult<Vec<PathBuf>> {
    let audio_dir = story.audio_dir(base_dir);
    std::fs::create_dir_all(&audio_dir)?;

    let mut files = Vec::with_capacity(keys.len());
    for key in keys {
        if key.is_empty() {
            continue;
        }
        let dest = audio_dir.join(part_file_name(key));
        info!("Fetching '{key}' to {}", dest.display());
        files.push(queue.fetch(key, &dest).await?);
    }
    Ok(files)
}

/// Local file name for a finished object key
///
/// Backends append a job id to the requested key, so
/// `lite/story/part1.<job>.mp3` comes back as `part1.mp3`.
fn part_file_name(key: &str) -> String {
    let base = key.rsplit('/').next().unwrap_or(key);
    let stem = base.split('.').next().unwrap_or(base);
    format!("{stem}.mp3")
}
