//! Property tests for the segmentation pipeline

use narrata_core::{segment_html, segment_text, Token};
use proptest::prelude::*;

/// Text pieces interleaved with directive markers
fn marked_up_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-zA-Z0-9 .!?]{1,40}",
            Just("[break=tiny]".to_string()),
            Just("[break=small]".to_string()),
            Just("[break=medium]".to_string()),
            Just("[break=large]".to_string()),
            Just("[cinematic]".to_string()),
            Just("[excited]".to_string()),
        ],
        0..8,
    )
    .prop_map(|pieces| pieces.join(" "))
}

proptest! {
    #[test]
    fn segmentation_is_deterministic(input in any::<String>()) {
        prop_assert_eq!(segment_html(&input), segment_html(&input));
    }

    #[test]
    fn text_tokens_come_out_collapsed(input in any::<String>()) {
        for token in segment_html(&input) {
            if let Token::Text(text) = token {
                prop_assert!(!text.is_empty());
                prop_assert_eq!(text.trim(), text.as_str());
                prop_assert!(!text.contains("  "));
                prop_assert!(!text.contains('\n'));
                prop_assert!(!text.contains('\t'));
            }
        }
    }

    #[test]
    fn leading_breaks_never_survive(input in any::<String>()) {
        if let Some(first) = segment_html(&input).first() {
            prop_assert!(!matches!(first, Token::Break(_)));
        }
    }

    #[test]
    fn whitespace_runs_collapse_to_single_spaces(
        words in prop::collection::vec("[a-z]{1,8}", 1..6),
        seps in prop::collection::vec("[ \t\n]{1,3}", 0..6),
    ) {
        let mut messy = String::new();
        for (index, word) in words.iter().enumerate() {
            if index > 0 {
                messy.push_str(seps.get(index - 1).map_or(" ", String::as_str));
            }
            messy.push_str(word);
        }

        let tokens = segment_text(&messy);
        prop_assert_eq!(tokens, vec![Token::Text(words.join(" "))]);
    }

    #[test]
    fn rendered_markers_reparse_to_the_same_tokens(input in marked_up_text()) {
        let tokens = segment_text(&input);
        let rendered = tokens
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        prop_assert_eq!(segment_text(&rendered), tokens);
    }

    #[test]
    fn html_wrapping_plain_text_changes_nothing(words in prop::collection::vec("[a-z]{1,8}", 1..5)) {
        let text = words.join(" ");
        let wrapped = format!("<p>{text}</p>");

        let from_html = segment_html(&wrapped);
        prop_assert_eq!(from_html.first(), Some(&Token::Text(text)));
    }
}
