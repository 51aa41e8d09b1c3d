//! Story references and their derived names and locations.
//!
//! A story is an ordered list of chapter references. A reference is either
//! a local `.txt` file or a remote story slug/URL. All output locations
//! (audio directory, stored HTML, remote object keys) derive from the
//! normalized title of the first reference.

use crate::error::{NarrataError, NarrataResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where a chapter's content comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// A plain-text file on disk
    LocalFile,
    /// A story reference resolved over HTTP
    Remote,
}

/// An ordered set of chapter references naming one story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRef {
    refs: Vec<String>,
}

impl StoryRef {
    /// Create a single-chapter story reference
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            refs: vec![reference.into()],
        }
    }

    /// Create a multi-chapter story reference
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty.
    pub fn from_refs(refs: Vec<String>) -> NarrataResult<Self> {
        if refs.is_empty() {
            return Err(NarrataError::invalid_input(
                "Story needs at least one chapter reference",
            ));
        }
        Ok(Self { refs })
    }

    /// Chapter references in reading order
    #[must_use]
    pub fn refs(&self) -> &[String] {
        &self.refs
    }

    /// Number of chapters
    #[must_use]
    pub fn chapter_count(&self) -> usize {
        self.refs.len()
    }

    /// Classify a chapter reference by its source
    #[must_use]
    pub fn source_kind(reference: &str) -> SourceKind {
        if reference.ends_with(".txt") {
            SourceKind::LocalFile
        } else {
            SourceKind::Remote
        }
    }

    /// Filesystem- and key-safe title derived from the first reference
    ///
    /// Takes the basename, strips a `.txt` suffix, lowercases, turns
    /// spaces into dashes and drops everything outside `[a-z0-9-]`.
    #[must_use]
    pub fn normalized_title(&self) -> String {
        let first = self.refs.first().map_or("", String::as_str);
        let base = first.rsplit('/').next().unwrap_or(first);
        let stem = base.strip_suffix(".txt").unwrap_or(base);
        stem.to_lowercase()
            .replace(' ', "-")
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
            .collect()
    }

    /// Human-readable title with dashes restored to spaces
    #[must_use]
    pub fn display_title(&self) -> String {
        self.normalized_title().replace('-', " ")
    }

    /// Directory receiving this story's audio parts
    #[must_use]
    pub fn audio_dir(&self, base: &Path) -> PathBuf {
        base.join("audio").join(self.normalized_title())
    }

    /// Path of the stored chapter HTML document
    #[must_use]
    pub fn html_path(&self, base: &Path) -> PathBuf {
        base.join("html")
            .join(format!("{}.html", self.normalized_title()))
    }

    /// Remote object key prefix shared by this story's parts
    #[must_use]
    pub fn remote_base_key(&self) -> String {
        format!("lite/{}", self.normalized_title())
    }

    /// Remote object key for one part, 1-based
    #[must_use]
    pub fn remote_part_key(&self, part: usize) -> String {
        format!("{}/part{part}", self.remote_base_key())
    }
}

impl std::fmt::Display for StoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.normalized_title())
    }
}
