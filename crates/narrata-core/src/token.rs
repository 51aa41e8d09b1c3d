//! Token model shared by the segmenter and the renderer.
//!
//! A document is linearized into an ordered sequence of [`Token`]s: plain
//! speakable text, silence directives, and style directives. A style
//! directive modifies exactly the next `Text` token, then the style reverts
//! to the default voice.

use serde::{Deserialize, Serialize};

/// Silence directive sizes with fixed durations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakSize {
    /// Micro-pause between sentences (0.1 s)
    Tiny,
    /// Pause after paragraphs and line breaks (0.3 s)
    Small,
    /// Pause after headings (0.6 s)
    Medium,
    /// Long dramatic pause (1.0 s)
    Large,
}

impl BreakSize {
    /// Silence duration in seconds
    #[must_use]
    pub const fn duration_secs(self) -> f32 {
        match self {
            Self::Tiny => 0.1,
            Self::Small => 0.3,
            Self::Medium => 0.6,
            Self::Large => 1.0,
        }
    }

    /// Lowercase size name as it appears inside the marker
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    /// Inline marker form, e.g. `[break=small]`
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Tiny => "[break=tiny]",
            Self::Small => "[break=small]",
            Self::Medium => "[break=medium]",
            Self::Large => "[break=large]",
        }
    }

    /// Parse a size name (`tiny`, `small`, `medium`, `large`)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "tiny" => Some(Self::Tiny),
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            _ => None,
        }
    }

    /// All sizes, smallest first
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Tiny, Self::Small, Self::Medium, Self::Large]
    }
}

impl std::fmt::Display for BreakSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Style directive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleKind {
    /// Heading delivery: alternate fixed voice at unchanged speed
    Cinematic,
    /// Emphasis delivery: default voice at elevated speed
    Excited,
}

impl StyleKind {
    /// Inline marker form, e.g. `[cinematic]`
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Cinematic => "[cinematic]",
            Self::Excited => "[excited]",
        }
    }

    /// Parse a full marker (`[cinematic]` or `[excited]`)
    #[must_use]
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "[cinematic]" => Some(Self::Cinematic),
            "[excited]" => Some(Self::Excited),
            _ => None,
        }
    }
}

impl std::fmt::Display for StyleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cinematic => write!(f, "cinematic"),
            Self::Excited => write!(f, "excited"),
        }
    }
}

/// One unit of segmented document content
///
/// Invariants: tokens appear in document order, `Text` never contains
/// markup, and `Break` carries no text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    /// A sentence-bounded span of plain speakable text
    Text(String),
    /// A silence directive
    Break(BreakSize),
    /// A style directive modifying the next `Text` token only
    StyleStart(StyleKind),
}

impl Token {
    /// Check whether this token is speakable text
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Get the text content, if any
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(content) => Some(content.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(content) => write!(f, "{content}"),
            Self::Break(size) => write!(f, "{}", size.marker()),
            Self::StyleStart(kind) => write!(f, "{}", kind.marker()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_duration_table() {
        assert_eq!(BreakSize::Tiny.duration_secs(), 0.1);
        assert_eq!(BreakSize::Small.duration_secs(), 0.3);
        assert_eq!(BreakSize::Medium.duration_secs(), 0.6);
        assert_eq!(BreakSize::Large.duration_secs(), 1.0);
    }

    #[test]
    fn test_break_markers() {
        assert_eq!(BreakSize::Tiny.marker(), "[break=tiny]");
        assert_eq!(BreakSize::Small.marker(), "[break=small]");
        assert_eq!(BreakSize::Medium.marker(), "[break=medium]");
        assert_eq!(BreakSize::Large.marker(), "[break=large]");
    }

    #[test]
    fn test_break_from_name() {
        for &size in BreakSize::all() {
            assert_eq!(BreakSize::from_name(size.name()), Some(size));
        }
        assert_eq!(BreakSize::from_name("huge"), None);
        assert_eq!(BreakSize::from_name("Tiny"), None);
        assert_eq!(BreakSize::from_name(""), None);
    }

    #[test]
    fn test_break_all_ordered() {
        let all = BreakSize::all();
        assert_eq!(all.len(), 4);
        for pair in all.windows(2) {
            assert!(pair[0].duration_secs() < pair[1].duration_secs());
        }
    }

    #[test]
    fn test_style_markers() {
        assert_eq!(StyleKind::Cinematic.marker(), "[cinematic]");
        assert_eq!(StyleKind::Excited.marker(), "[excited]");
        assert_eq!(
            StyleKind::from_marker("[cinematic]"),
            Some(StyleKind::Cinematic)
        );
        assert_eq!(StyleKind::from_marker("[excited]"), Some(StyleKind::Excited));
        assert_eq!(StyleKind::from_marker("[loud]"), None);
        assert_eq!(StyleKind::from_marker("cinematic"), None);
    }

    #[test]
    fn test_style_display() {
        assert_eq!(StyleKind::Cinematic.to_string(), "cinematic");
        assert_eq!(StyleKind::Excited.to_string(), "excited");
    }

    #[test]
    fn test_token_helpers() {
        let text = Token::Text("Hello".to_string());
        assert!(text.is_text());
        assert_eq!(text.as_text(), Some("Hello"));

        let brk = Token::Break(BreakSize::Small);
        assert!(!brk.is_text());
        assert_eq!(brk.as_text(), None);

        let style = Token::StyleStart(StyleKind::Excited);
        assert!(!style.is_text());
        assert_eq!(style.as_text(), None);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(Token::Text("Hi there.".to_string()).to_string(), "Hi there.");
        assert_eq!(Token::Break(BreakSize::Medium).to_string(), "[break=medium]");
        assert_eq!(
            Token::StyleStart(StyleKind::Cinematic).to_string(),
            "[cinematic]"
        );
    }

    #[test]
    fn test_token_serialization() {
        let tokens = vec![
            Token::StyleStart(StyleKind::Cinematic),
            Token::Text("Intro".to_string()),
            Token::Break(BreakSize::Medium),
        ];
        let json = serde_json::to_string(&tokens).expect("Should serialize");
        let deserialized: Vec<Token> = serde_json::from_str(&json).expect("Should deserialize");
        assert_eq!(tokens, deserialized);
    }
}
