//! Story retrieval over HTTP and local text files.
//!
//! Remote chapters are paginated; each page is fetched, the story body is
//! selected out of the page chrome, and paragraphs without at least one
//! real word are discarded. Pagination is a bounded loop that stops at the
//! first page yielding no paragraphs. Chapters fail individually: one bad
//! reference never aborts the rest of a story.

use crate::error::{NarrataError, NarrataResult};
use crate::story::{SourceKind, StoryRef};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

/// Default story host
const DEFAULT_BASE_URL: &str = "http://www.literotica.com";

/// Browser user agent sent with story requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/97.0.4692.71 Safari/537.36";

/// Selector picking story paragraphs out of the page
const DEFAULT_CONTENT_SELECTOR: &str = "div.aa_ht p";

/// Pagination bound per chapter
const DEFAULT_MAX_PAGES: usize = 100;

/// Fetcher settings
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Host prepended to bare story references
    pub base_url: String,
    /// User agent header value
    pub user_agent: String,
    /// CSS selector for story paragraphs
    pub content_selector: String,
    /// Upper bound on pages fetched per chapter
    pub max_pages: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            content_selector: DEFAULT_CONTENT_SELECTOR.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            timeout_secs: 30,
        }
    }
}

impl FetchConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the story host
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> NarrataResult<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(NarrataError::configuration("Base URL cannot be empty"));
        }
        self.base_url = base_url;
        Ok(self)
    }

    /// Set the pagination bound
    ///
    /// # Errors
    ///
    /// Returns an error if the bound is zero.
    pub fn with_max_pages(mut self, max_pages: usize) -> NarrataResult<Self> {
        if max_pages == 0 {
            return Err(NarrataError::configuration(
                "Page bound must be at least 1",
            ));
        }
        self.max_pages = max_pages;
        Ok(self)
    }

    /// Set the paragraph selector
    #[must_use]
    pub fn with_content_selector(mut self, selector: impl Into<String>) -> Self {
        self.content_selector = selector.into();
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Request timeout as a duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Outcome of fetching one chapter
#[derive(Debug)]
pub struct ChapterResult {
    /// The chapter reference that was fetched
    pub reference: String,
    /// Chapter HTML, or the failure that stopped it
    pub html: NarrataResult<String>,
}

struct Paragraph {
    html: String,
    text: String,
}

/// Fetches stories page by page and reshapes them for segmentation
#[derive(Debug)]
pub struct StoryFetcher {
    client: reqwest::Client,
    config: FetchConfig,
    selector: Selector,
}

impl StoryFetcher {
    /// Create a fetcher from the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the content selector does not parse or the HTTP
    /// client cannot be constructed.
    pub fn new(config: FetchConfig) -> NarrataResult<Self> {
        let selector = Selector::parse(&config.content_selector).map_err(|_| {
            NarrataError::configuration(format!(
                "Invalid content selector '{}'",
                config.content_selector
            ))
        })?;
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            config,
            selector,
        })
    }

    /// Configuration this fetcher was built with
    #[must_use]
    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch one chapter as HTML with chapter and page headings
    ///
    /// The result is `<h1>Chapter N</h1>` followed by one
    /// `<h2>Page N</h2>` block per fetched page, each paragraph wrapped in
    /// a `<p>` element with inline markup preserved.
    ///
    /// # Errors
    ///
    /// Returns [`NarrataError::FetchError`] when a page request fails or
    /// comes back non-200.
    pub async fn fetch_chapter_html(
        &self,
        reference: &str,
        chapter: usize,
    ) -> NarrataResult<String> {
        let mut out = format!("<h1>Chapter {chapter}</h1>\n");
        for page in 1..=self.config.max_pages {
            let paragraphs = self.fetch_page(reference, page).await?;
            if paragraphs.is_empty() {
                if page == 1 {
                    warn!("No content on first page of '{reference}'");
                }
                break;
            }
            out.push_str(&format!("<h2>Page {page}</h2>\n"));
            for paragraph in paragraphs {
                out.push_str(&format!("<p>{}</p>\n", paragraph.html));
            }
            out.push('\n');
        }
        out.push('\n');
        Ok(out)
    }

    /// Fetch every chapter of a story, one result per chapter
    pub async fn fetch_story_html(&self, story: &StoryRef) -> Vec<ChapterResult> {
        let mut chapters = Vec::with_capacity(story.chapter_count());
        for (index, reference) in story.refs().iter().enumerate() {
            let html = self.fetch_chapter_html(reference, index + 1).await;
            if let Err(error) = &html {
                warn!("Chapter '{reference}' failed: {error}");
            }
            chapters.push(ChapterResult {
                reference: reference.clone(),
                html,
            });
        }
        chapters
    }

    /// Fetch one remote chapter as plain text with page headers
    ///
    /// # Errors
    ///
    /// Returns [`NarrataError::FetchError`] when a page request fails.
    pub async fn fetch_chapter_text(&self, reference: &str) -> NarrataResult<String> {
        let mut out = String::new();
        for page in 1..=self.config.max_pages {
            let paragraphs = self.fetch_page(reference, page).await?;
            if paragraphs.is_empty() {
                break;
            }
            out.push_str(&format!("Page {page}\n\n"));
            for paragraph in paragraphs {
                out.push_str(paragraph.text.trim());
                out.push_str("\n\n");
            }
        }
        Ok(out)
    }

    /// Fetch a whole story as plain-text parts sized for batch synthesis
    ///
    /// Local `.txt` references are read from disk; remote references are
    /// paginated like [`StoryFetcher::fetch_chapter_text`]. A story whose
    /// first reference is a local file is prefixed with its display title.
    ///
    /// # Errors
    ///
    /// Returns the first chapter failure; the text flow needs the whole
    /// story.
    pub async fn fetch_story_text(&self, story: &StoryRef) -> NarrataResult<Vec<String>> {
        let mut full = String::new();
        if let Some(first) = story.refs().first() {
            if StoryRef::source_kind(first) == SourceKind::LocalFile {
                full.push_str(&story.display_title());
                full.push_str("\n\n");
            }
        }

        for reference in story.refs() {
            let chunk = match StoryRef::source_kind(reference) {
                SourceKind::LocalFile => std::fs::read_to_string(reference)?,
                SourceKind::Remote => self.fetch_chapter_text(reference).await?,
            };
            full.push_str(&chunk);
            if !full.ends_with("\n\n") {
                full.push_str("\n\n");
            }
        }

        Ok(split_text_parts(&full, crate::MAX_PART_CHARS))
    }

    async fn fetch_page(&self, reference: &str, page: usize) -> NarrataResult<Vec<Paragraph>> {
        let url = page_url(&self.config.base_url, reference, page);
        debug!("Fetching {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| NarrataError::fetch(reference, format!("Request failed: {e}")))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(NarrataError::fetch(
                reference,
                format!("HTTP {status} for {url}"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| NarrataError::fetch(reference, format!("Failed to read body: {e}")))?;

        Ok(self.extract_paragraphs(&body))
    }

    fn extract_paragraphs(&self, body: &str) -> Vec<Paragraph> {
        let document = Html::parse_document(body);
        document
            .select(&self.selector)
            .filter_map(|element| {
                let text: String = element.text().collect();
                if has_real_word(&text) {
                    Some(Paragraph {
                        html: element.inner_html().trim().to_string(),
                        text,
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Build the URL of one story page
fn page_url(base_url: &str, reference: &str, page: usize) -> String {
    if reference.starts_with("http") {
        format!("{reference}?page={page}")
    } else {
        format!("{base_url}/s/{reference}?page={page}")
    }
}

/// Keep only paragraphs containing at least one three-letter word
fn has_real_word(text: &str) -> bool {
    text.as_bytes()
        .windows(3)
        .any(|window| window.iter().all(u8::is_ascii_alphabetic))
}

/// Split text into parts of at most `max_chars` at paragraph boundaries
///
/// Paragraphs are blank-line separated. A single paragraph longer than the
/// limit forms its own oversized part rather than being cut mid-sentence.
#[must_use]
pub fn split_text_parts(text: &str, max_chars: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").filter(|p| !p.trim().is_empty()) {
        let added = paragraph.len() + 2;
        if !current.is_empty() && current.len() + added > max_chars {
            parts.push(current);
            current = String::new();
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
