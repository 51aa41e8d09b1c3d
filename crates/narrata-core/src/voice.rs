//! Voice catalog for the remote reading queue.
//!
//! Remote batch synthesis needs a language code per voice; the catalog
//! carries the supported voice ids and their languages. Local pipeline
//! voices (the Kokoro-style ids in [`crate::DEFAULT_VOICE`] and
//! [`crate::CINEMATIC_VOICE`]) are passed through to the backend untouched
//! and do not appear here.

use crate::error::{NarrataError, NarrataResult};
use std::collections::HashMap;

/// Built-in voice-to-language table
const VOICE_LANGUAGES: &[(&str, &str)] = &[
    ("Brian", "en-GB"),
    ("Amy", "en-GB"),
    ("Emma", "en-GB"),
    ("Ivy", "en-US"),
    ("Joanna", "en-US"),
    ("Kendra", "en-US"),
    ("Kimberly", "en-US"),
    ("Sally", "en-US"),
    ("Joey", "en-US"),
    ("Justin", "en-US"),
    ("Kevin", "en-US"),
    ("Matthew", "en-US"),
    ("Geraint", "en-GB-WLS"),
    ("Ayanda", "en-ZA"),
    ("Nicole", "en-AU"),
    ("Olivia", "en-AU"),
    ("Russell", "en-AU"),
    ("Aditi", "en-IN"),
    ("Raveena", "en-IN"),
    ("Aria", "en-NZ"),
];

/// Immutable catalog of remote voices and their language codes
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    languages: HashMap<&'static str, &'static str>,
}

impl VoiceCatalog {
    /// Create the catalog with the built-in voice table
    #[must_use]
    pub fn new() -> Self {
        Self {
            languages: VOICE_LANGUAGES.iter().copied().collect(),
        }
    }

    /// Look up the language code for a voice
    ///
    /// # Errors
    ///
    /// Returns [`NarrataError::VoiceNotFound`] for an unknown voice id.
    pub fn language_for(&self, voice_id: &str) -> NarrataResult<&'static str> {
        self.languages
            .get(voice_id)
            .copied()
            .ok_or_else(|| NarrataError::voice_not_found(voice_id))
    }

    /// Check whether a voice id is in the catalog
    #[must_use]
    pub fn contains(&self, voice_id: &str) -> bool {
        self.languages.contains_key(voice_id)
    }

    /// All known voice ids in sorted order
    #[must_use]
    pub fn available_voices(&self) -> Vec<&'static str> {
        let mut voices: Vec<&'static str> = self.languages.keys().copied().collect();
        voices.sort_unstable();
        voices
    }
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Brian", "en-GB")]
    #[case("Emma", "en-GB")]
    #[case("Joanna", "en-US")]
    #[case("Matthew", "en-US")]
    #[case("Geraint", "en-GB-WLS")]
    #[case("Ayanda", "en-ZA")]
    #[case("Nicole", "en-AU")]
    #[case("Russell", "en-AU")]
    #[case("Aditi", "en-IN")]
    #[case("Aria", "en-NZ")]
    fn test_language_mapping(#[case] voice: &str, #[case] language: &str) {
        let catalog = VoiceCatalog::new();
        assert_eq!(catalog.language_for(voice).expect("Known voice"), language);
    }

    #[test]
    fn test_default_remote_voice_is_known() {
        let catalog = VoiceCatalog::new();
        assert!(catalog.contains(crate::DEFAULT_REMOTE_VOICE));
        assert_eq!(
            catalog
                .language_for(crate::DEFAULT_REMOTE_VOICE)
                .expect("Known voice"),
            "en-GB"
        );
    }

    #[test]
    fn test_unknown_voice() {
        let catalog = VoiceCatalog::new();
        let result = catalog.language_for("Bogus");
        match result {
            Err(NarrataError::VoiceNotFound { voice_id }) => assert_eq!(voice_id, "Bogus"),
            other => panic!("Expected VoiceNotFound, got {other:?}"),
        }
        assert!(!catalog.contains("Bogus"));
    }

    #[test]
    fn test_catalog_size_and_ordering() {
        let catalog = VoiceCatalog::new();
        let voices = catalog.available_voices();
        assert_eq!(voices.len(), 20);
        let mut sorted = voices.clone();
        sorted.sort_unstable();
        assert_eq!(voices, sorted);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let catalog = VoiceCatalog::new();
        assert!(catalog.language_for("brian").is_err());
    }
}
