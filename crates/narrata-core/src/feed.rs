//! Podcast feed generation for rendered story audio.
//!
//! Story audio directories are scanned for mp3 parts and published as an
//! RSS 2.0 feed with the iTunes podcast extension. Episode order follows
//! sorted file names so regenerating the feed is deterministic.

use crate::error::{NarrataError, NarrataResult};
use crate::export::AudioFormat;
use chrono::{DateTime, Utc};
use rss::extension::itunes::{ITunesCategoryBuilder, ITunesChannelExtensionBuilder};
use rss::{Channel, ChannelBuilder, EnclosureBuilder, GuidBuilder, Item, ItemBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Channel-level feed settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Feed title
    pub title: String,
    /// Web site the feed belongs to
    pub site_link: String,
    /// Short channel description
    pub subtitle: String,
    /// Feed author shown in podcast clients
    pub author: String,
    /// Contact address, omitted when empty
    pub email: Option<String>,
    /// Channel language code
    pub language: String,
    /// iTunes explicit flag
    pub explicit: bool,
    /// Top-level iTunes category
    pub category: String,
    /// iTunes subcategory
    pub subcategory: String,
    /// Base URL the audio files are served under
    pub base_audio_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: "Narrata Stories".to_string(),
            site_link: "http://localhost:8000".to_string(),
            subtitle: "Stories formatted for audio playback".to_string(),
            author: "Narrata".to_string(),
            email: None,
            language: "en".to_string(),
            explicit: true,
            category: "Fiction".to_string(),
            subcategory: "Erotica".to_string(),
            base_audio_url: "http://localhost:8000/audio".to_string(),
        }
    }
}

impl FeedConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the feed title
    ///
    /// # Errors
    ///
    /// Returns an error if the title is empty.
    pub fn with_title(mut self, title: impl Into<String>) -> NarrataResult<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(NarrataError::configuration("Feed title cannot be empty"));
        }
        self.title = title;
        Ok(self)
    }

    /// Set the base URL audio enclosures are served under
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty.
    pub fn with_base_audio_url(mut self, base_audio_url: impl Into<String>) -> NarrataResult<Self> {
        let base_audio_url = base_audio_url.into();
        if base_audio_url.trim().is_empty() {
            return Err(NarrataError::configuration("Audio base URL cannot be empty"));
        }
        self.base_audio_url = base_audio_url;
        Ok(self)
    }
}

/// One feed entry backed by an mp3 part on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    /// Public URL, also used as the guid
    pub url: String,
    /// Entry title
    pub title: String,
    /// Entry description
    pub description: String,
    /// Enclosure size in bytes
    pub length_bytes: u64,
    /// Publication timestamp, taken from the file's mtime
    pub pub_date: Option<DateTime<Utc>>,
}

/// Collect one story's mp3 parts as feed episodes
///
/// Parts are numbered in sorted file-name order and titled
/// `"<story> (<part> of <parts>)"`. A directory without mp3 files yields
/// an empty list.
///
/// # Errors
///
/// Returns an error if the directory cannot be scanned or a part's
/// metadata cannot be read.
pub fn scan_story_dir(dir: &Path, story: &str, base_url: &str) -> NarrataResult<Vec<Episode>> {
    let pattern = format!("{}/*.mp3", dir.display());
    let mut parts: Vec<_> = glob::glob(&pattern)
        .map_err(|e| NarrataError::configuration(format!("Invalid scan pattern: {e}")))?
        .filter_map(Result::ok)
        .collect();
    parts.sort();

    let total = parts.len();
    let mut episodes = Vec::with_capacity(total);
    for (index, path) in parts.iter().enumerate() {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                NarrataError::file(format!("Unreadable file name in {}", dir.display()))
            })?;
        let metadata = std::fs::metadata(path)?;
        let pub_date = metadata.modified().ok().map(DateTime::<Utc>::from);

        episodes.push(Episode {
            url: format!("{}/{story}/{file_name}", base_url.trim_end_matches('/')),
            title: format!("{story} ({} of {total})", index + 1),
            description: format!("Part {} of {total} of {story}", index + 1),
            length_bytes: metadata.len(),
            pub_date,
        });
    }

    debug!("Found {total} part(s) for '{story}' in {}", dir.display());
    Ok(episodes)
}

/// Collect episodes for every story directory under an audio root
///
/// Stories are visited in sorted directory-name order.
///
/// # Errors
///
/// Returns an error if the root or one of its story directories cannot
/// be read.
pub fn scan_audio_root(root: &Path, base_url: &str) -> NarrataResult<Vec<Episode>> {
    let mut stories = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.path().is_dir() {
            stories.push(entry.path());
        }
    }
    stories.sort();

    let mut episodes = Vec::new();
    for dir in &stories {
        let story = dir
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        episodes.extend(scan_story_dir(dir, &story, base_url)?);
    }

    info!(
        "Scanned {} stor(ies) under {} into {} episode(s)",
        stories.len(),
        root.display(),
        episodes.len()
    );
    Ok(episodes)
}

/// Assemble the RSS channel for a set of episodes
#[must_use]
pub fn build_feed(config: &FeedConfig, episodes: &[Episode]) -> Channel {
    let category = ITunesCategoryBuilder::default()
        .text(config.category.clone())
        .subcategory(Some(Box::new(
            ITunesCategoryBuilder::default()
                .text(config.subcategory.clone())
                .build(),
        )))
        .build();
    let itunes = ITunesChannelExtensionBuilder::default()
        .author(Some(config.author.clone()))
        .subtitle(Some(config.subtitle.clone()))
        .explicit(Some(
            if config.explicit { "yes" } else { "no" }.to_string(),
        ))
        .categories(vec![category])
        .build();

    let items: Vec<Item> = episodes.iter().map(build_item).collect();

    ChannelBuilder::default()
        .title(config.title.clone())
        .link(config.site_link.clone())
        .description(config.subtitle.clone())
        .language(Some(config.language.clone()))
        .managing_editor(config.email.clone())
        .generator(Some(format!("narrata {}", crate::VERSION)))
        .last_build_date(Some(Utc::now().to_rfc2822()))
        .itunes_ext(Some(itunes))
        .items(items)
        .build()
}

fn build_item(episode: &Episode) -> Item {
    let guid = GuidBuilder::default()
        .value(episode.url.clone())
        .permalink(false)
        .build();
    let enclosure = EnclosureBuilder::default()
        .url(episode.url.clone())
        .length(episode.length_bytes.to_string())
        .mime_type(AudioFormat::Mp3.mime_type().to_string())
        .build();

    ItemBuilder::default()
        .title(Some(episode.title.clone()))
        .description(Some(episode.description.clone()))
        .guid(Some(guid))
        .enclosure(Some(enclosure))
        .pub_date(episode.pub_date.map(|date| date.to_rfc2822()))
        .build()
}

/// Write a channel as an XML document
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_feed(channel: &Channel, path: &Path) -> NarrataResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let document = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{channel}");
    std::fs::write(path, document)?;
    info!(
        "Wrote feed with {} episode(s) to {}",
        channel.items().len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_episode() -> Episode {
        Episode {
            url: "http://localhost:8000/audio/my-story/part1.mp3".to_string(),
            title: "my-story (1 of 1)".to_string(),
            description: "Part 1 of 1 of my-story".to_string(),
            length_bytes: 1024,
            pub_date: None,
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = FeedConfig::default();
        assert_eq!(config.language, "en");
        assert_eq!(config.category, "Fiction");
        assert_eq!(config.subcategory, "Erotica");
        assert!(config.explicit);
        assert!(config.email.is_none());
    }

    #[test]
    fn test_config_builders_validate() {
        let config = FeedConfig::new()
            .with_title("Night Stories")
            .expect("Title should be accepted")
            .with_base_audio_url("http://host/audio")
            .expect("URL should be accepted");
        assert_eq!(config.title, "Night Stories");
        assert_eq!(config.base_audio_url, "http://host/audio");

        assert!(FeedConfig::new().with_title("  ").is_err());
        assert!(FeedConfig::new().with_base_audio_url("").is_err());
    }

    #[test]
    fn test_scan_empty_dir() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let episodes = scan_story_dir(temp.path(), "my-story", "http://host/audio")
            .expect("Scan should succeed");
        assert!(episodes.is_empty());
    }

    #[test]
    fn test_scan_orders_and_numbers_parts() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        std::fs::write(temp.path().join("part2.mp3"), b"bb").expect("Should write part");
        std::fs::write(temp.path().join("part1.mp3"), b"aaaa").expect("Should write part");
        std::fs::write(temp.path().join("notes.txt"), b"skip").expect("Should write file");

        let episodes = scan_story_dir(temp.path(), "my-story", "http://host/audio/")
            .expect("Scan should succeed");

        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].title, "my-story (1 of 2)");
        assert_eq!(episodes[0].url, "http://host/audio/my-story/part1.mp3");
        assert_eq!(episodes[0].length_bytes, 4);
        assert!(episodes[0].pub_date.is_some());
        assert_eq!(episodes[1].title, "my-story (2 of 2)");
        assert_eq!(episodes[1].length_bytes, 2);
    }

    #[test]
    fn test_scan_audio_root_visits_stories_in_order() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let zebra = temp.path().join("zebra-story");
        let alpha = temp.path().join("alpha-story");
        std::fs::create_dir_all(&zebra).expect("Should create dir");
        std::fs::create_dir_all(&alpha).expect("Should create dir");
        std::fs::write(zebra.join("part1.mp3"), b"z").expect("Should write part");
        std::fs::write(alpha.join("part1.mp3"), b"a").expect("Should write part");

        let episodes =
            scan_audio_root(temp.path(), "http://host/audio").expect("Scan should succeed");

        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].title, "alpha-story (1 of 1)");
        assert_eq!(episodes[1].title, "zebra-story (1 of 1)");
    }

    #[test]
    fn test_build_feed_channel_fields() {
        let channel = build_feed(&FeedConfig::default(), &[sample_episode()]);

        assert_eq!(channel.title(), "Narrata Stories");
        assert_eq!(channel.language(), Some("en"));
        assert_eq!(channel.items().len(), 1);

        let itunes = channel.itunes_ext().expect("Should carry iTunes extension");
        assert_eq!(itunes.explicit(), Some("yes"));
        let category = &itunes.categories()[0];
        assert_eq!(category.text(), "Fiction");
        assert_eq!(
            category.subcategory().map(|sub| sub.text()),
            Some("Erotica")
        );

        let item = &channel.items()[0];
        assert_eq!(item.title(), Some("my-story (1 of 1)"));
        let enclosure = item.enclosure().expect("Should carry enclosure");
        assert_eq!(enclosure.mime_type(), "audio/mpeg");
        assert_eq!(enclosure.length(), "1024");
        let guid = item.guid().expect("Should carry guid");
        assert!(!guid.is_permalink());
    }

    #[test]
    fn test_explicit_flag_off() {
        let config = FeedConfig {
            explicit: false,
            ..FeedConfig::default()
        };
        let channel = build_feed(&config, &[]);
        let itunes = channel.itunes_ext().expect("Should carry iTunes extension");
        assert_eq!(itunes.explicit(), Some("no"));
    }

    #[test]
    fn test_write_feed_round_trip() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let path = temp.path().join("feeds/stories.xml");

        let channel = build_feed(&FeedConfig::default(), &[sample_episode()]);
        write_feed(&channel, &path).expect("Feed should write");

        let written = std::fs::read_to_string(&path).expect("Should read feed back");
        assert!(written.starts_with("<?xml version=\"1.0\""));

        let reparsed = Channel::read_from(written.as_bytes()).expect("Feed should parse");
        assert_eq!(reparsed.title(), "Narrata Stories");
        assert_eq!(reparsed.items().len(), 1);
        assert_eq!(
            reparsed.items()[0].enclosure().map(rss::Enclosure::length),
            Some("1024")
        );
    }
}
