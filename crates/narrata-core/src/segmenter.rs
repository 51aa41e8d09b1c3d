//! Markup segmentation into renderable token sequences.
//!
//! The segmenter linearizes a document into [`Token`]s in document order.
//! Elements map to directives: headings wrap their text in a cinematic
//! style and a medium break, emphasis tags mark the following text excited,
//! `br` and paragraph-level containers contribute small breaks, and
//! non-speech elements are excised entirely. Text is collapsed, Unicode
//! NFC normalized, and split into one `Text` token per sentence.
//!
//! Segmentation is lenient and never fails: unknown elements are plain
//! containers and unknown markers stay literal text. A document with no
//! speakable text yields an empty sequence.

use crate::token::{BreakSize, StyleKind, Token};
use scraper::{ElementRef, Html, Node};
use unicode_normalization::UnicodeNormalization;

/// Segment an HTML string into tokens
#[must_use]
pub fn segment_html(html: &str) -> Vec<Token> {
    let document = Html::parse_document(html);
    segment_document(&document)
}

/// Segment an already-parsed HTML document into tokens
#[must_use]
pub fn segment_document(document: &Html) -> Vec<Token> {
    let mut emitter = TokenEmitter::new();
    walk_children(document.root_element(), &mut emitter);
    emitter.finish()
}

/// Segment plain text carrying inline directive markers
///
/// Recognized markers are `[break=tiny]`, `[break=small]`, `[break=medium]`,
/// `[break=large]`, `[cinematic]` and `[excited]`. Any other bracketed run
/// is kept as literal text.
#[must_use]
pub fn segment_text(text: &str) -> Vec<Token> {
    let mut emitter = TokenEmitter::new();
    let mut remaining = text;

    while let Some(open) = remaining.find('[') {
        if let Some((directive, rest)) = parse_marker(&remaining[open..]) {
            emitter.text(&remaining[..open]);
            match directive {
                Directive::Break(size) => emitter.break_directive(size),
                Directive::Style(kind) => emitter.style_directive(kind),
            }
            remaining = rest;
        } else {
            let after_bracket = open + 1;
            emitter.text(&remaining[..after_bracket]);
            remaining = &remaining[after_bracket..];
        }
    }

    emitter.text(remaining);
    emitter.finish()
}

enum Directive {
    Break(BreakSize),
    Style(StyleKind),
}

/// Try to read a directive marker at the start of `tail`
fn parse_marker(tail: &str) -> Option<(Directive, &str)> {
    for kind in [StyleKind::Cinematic, StyleKind::Excited] {
        if let Some(rest) = tail.strip_prefix(kind.marker()) {
            return Some((Directive::Style(kind), rest));
        }
    }
    let body = tail.strip_prefix("[break=")?;
    let close = body.find(']')?;
    let size = BreakSize::from_name(&body[..close])?;
    Some((Directive::Break(size), &body[close + 1..]))
}

fn walk_children(element: ElementRef<'_>, emitter: &mut TokenEmitter) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => emitter.text(text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    walk_element(child_element, emitter);
                }
            }
            _ => {}
        }
    }
}

fn walk_element(element: ElementRef<'_>, emitter: &mut TokenEmitter) {
    match element.value().name() {
        "script" | "style" | "noscript" | "meta" | "link" | "title" => {}
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            emitter.style_directive(StyleKind::Cinematic);
            walk_children(element, emitter);
            emitter.break_directive(BreakSize::Medium);
        }
        "em" | "i" | "strong" | "b" => {
            emitter.style_directive(StyleKind::Excited);
            walk_children(element, emitter);
        }
        "br" => emitter.break_directive(BreakSize::Small),
        "p" | "div" => {
            walk_children(element, emitter);
            emitter.break_directive(BreakSize::Small);
        }
        _ => walk_children(element, emitter),
    }
}

/// Folds text fragments and directives into the output token sequence.
///
/// Text accumulates into a run until a directive arrives; directives flush
/// the run as sentence tokens with tiny breaks between sentences. A pending
/// style attaches to the first sentence of the next run and is dropped when
/// a break arrives first. Break tokens are suppressed until the first text
/// token exists, so directive-only documents come out empty.
struct TokenEmitter {
    tokens: Vec<Token>,
    run: String,
    pending_style: Option<StyleKind>,
    spoke: bool,
}

impl TokenEmitter {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            run: String::new(),
            pending_style: None,
            spoke: false,
        }
    }

    fn text(&mut self, fragment: &str) {
        self.run.push_str(fragment);
    }

    fn style_directive(&mut self, kind: StyleKind) {
        self.flush_run();
        self.pending_style = Some(kind);
    }

    fn break_directive(&mut self, size: BreakSize) {
        self.flush_run();
        self.pending_style = None;
        if self.spoke {
            self.tokens.push(Token::Break(size));
        }
    }

    fn flush_run(&mut self) {
        let collapsed = normalize_text(&self.run);
        self.run.clear();
        if collapsed.is_empty() {
            return;
        }

        for (index, sentence) in split_sentences(&collapsed).into_iter().enumerate() {
            if index == 0 {
                if let Some(kind) = self.pending_style.take() {
                    self.tokens.push(Token::StyleStart(kind));
                }
            } else {
                self.tokens.push(Token::Break(BreakSize::Tiny));
            }
            self.tokens.push(Token::Text(sentence.to_string()));
            self.spoke = true;
        }
    }

    fn finish(mut self) -> Vec<Token> {
        self.flush_run();
        self.tokens
    }
}

/// Collapse whitespace to single spaces and apply Unicode NFC
fn normalize_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.nfc().collect()
}

/// Split collapsed text at sentence terminators followed by whitespace
///
/// Expects whitespace-collapsed input, so the boundary is a terminator
/// directly before a single space.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut after_terminator = false;

    for (index, character) in text.char_indices() {
        if character == ' ' && after_terminator {
            sentences.push(&text[start..index]);
            start = index + 1;
        }
        after_terminator = matches!(character, '.' | '!' | '?');
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_and_paragraph() {
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
    fn test_emphasis_then_text() {
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
    fn test_empty_div_yields_nothing() {
        assert!(segment_html("<div></div>").is_empty());
    }

    #[test]
    fn test_whitespace_only_document_yields_nothing() {
        assert!(segment_html("  \n\t  ").is_empty());
        assert!(segment_html("<p>   </p><div>\n</div>").is_empty());
    }

    #[test]
    fn test_one_text_per_sentence_with_tiny_breaks_between() {
        let tokens = segment_html("<p>One. Two! Three?</p>");
        assert_eq!(
            tokens,
            vec![
                Token::Text("One.".to_string()),
                Token::Break(BreakSize::Tiny),
                Token::Text("Two!".to_string()),
                Token::Break(BreakSize::Tiny),
                Token::Text("Three?".to_string()),
                Token::Break(BreakSize::Small),
            ]
        );
    }

    #[test]
    fn test_small_break_per_paragraph() {
        let tokens = segment_html("<p>First.</p><p>Second.</p>");
        let small_breaks = tokens
            .iter()
            .filter(|t| **t == Token::Break(BreakSize::Small))
            .count();
        assert_eq!(small_breaks, 2);
        let texts: Vec<_> = tokens.iter().filter(|t| t.is_text()).collect();
        assert_eq!(texts.len(), 2);
    }

    #[test]
    fn test_br_is_small_break() {
        let tokens = segment_html("Line one.<br>Line two.");
        assert_eq!(
            tokens,
            vec![
                Token::Text("Line one.".to_string()),
                Token::Break(BreakSize::Small),
                Token::Text("Line two.".to_string()),
            ]
        );
    }

    #[test]
    fn test_non_speech_elements_excised() {
        let html = "<title>Skip</title><script>var x = 1;</script>\
                    <style>p { color: red; }</style><p>Keep.</p>";
        let tokens = segment_html(html);
        assert_eq!(
            tokens,
            vec![
                Token::Text("Keep.".to_string()),
                Token::Break(BreakSize::Small),
            ]
        );
    }

    #[test]
    fn test_unknown_elements_are_plain_containers() {
        let tokens = segment_html("<article><span>Hello there.</span></article>");
        assert_eq!(tokens, vec![Token::Text("Hello there.".to_string())]);
    }

    #[test]
    fn test_whitespace_collapsed() {
        let tokens = segment_html("<p>Hello   \n\t world.</p>");
        assert_eq!(tokens[0], Token::Text("Hello world.".to_string()));
    }

    #[test]
    fn test_nfc_normalization() {
        // "e" followed by a combining acute accent composes to a single char
        let tokens = segment_html("<p>Cafe\u{301}.</p>");
        assert_eq!(tokens[0], Token::Text("Caf\u{e9}.".to_string()));
    }

    #[test]
    fn test_run_continues_past_inline_close() {
        // No sentence boundary at the emphasis close, so the style covers
        // the whole first sentence
        let tokens = segment_html("<em>Wow</em> nice.");
        assert_eq!(
            tokens,
            vec![
                Token::StyleStart(StyleKind::Excited),
                Token::Text("Wow nice.".to_string()),
            ]
        );
    }

    #[test]
    fn test_stacked_styles_last_wins() {
        let tokens = segment_html("<h1><em>Hi.</em></h1>");
        assert_eq!(
            tokens,
            vec![
                Token::StyleStart(StyleKind::Excited),
                Token::Text("Hi.".to_string()),
                Token::Break(BreakSize::Medium),
            ]
        );
    }

    #[test]
    fn test_empty_heading_discards_style() {
        let tokens = segment_html("<h1></h1><p>Hello.</p>");
        assert_eq!(
            tokens,
            vec![
                Token::Text("Hello.".to_string()),
                Token::Break(BreakSize::Small),
            ]
        );
    }

    #[test]
    fn test_leading_break_suppressed() {
        let tokens = segment_html("<br>Hello.");
        assert_eq!(tokens, vec![Token::Text("Hello.".to_string())]);
    }

    #[test]
    fn test_nested_containers_stack_breaks() {
        let tokens = segment_html("<div><p>Inside.</p></div>");
        assert_eq!(
            tokens,
            vec![
                Token::Text("Inside.".to_string()),
                Token::Break(BreakSize::Small),
                Token::Break(BreakSize::Small),
            ]
        );
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let html = "<h2>Part one</h2><p>Some text. More text!</p><br><em>End.</em>";
        let first = segment_html(html);
        let second = segment_html(html);
        assert_eq!(first, second);
    }

    #[test]
    fn test_marker_text_breaks_and_styles() {
        let tokens = segment_text("Hello. [break=large] [cinematic] A new scene.");
        assert_eq!(
            tokens,
            vec![
                Token::Text("Hello.".to_string()),
                Token::Break(BreakSize::Large),
                Token::StyleStart(StyleKind::Cinematic),
                Token::Text("A new scene.".to_string()),
            ]
        );
    }

    #[test]
    fn test_marker_text_unknown_markers_stay_literal() {
        let tokens = segment_text("Use [CTRL] to fire.");
        assert_eq!(tokens, vec![Token::Text("Use [CTRL] to fire.".to_string())]);

        let tokens = segment_text("Mismatched [break=huge] marker.");
        assert_eq!(
            tokens,
            vec![Token::Text("Mismatched [break=huge] marker.".to_string())]
        );
    }

    #[test]
    fn test_marker_text_adjacent_breaks_kept() {
        // Collapsing overlapping silence is the renderer's job
        let tokens = segment_text("First. [break=medium][break=tiny] Second.");
        assert_eq!(
            tokens,
            vec![
                Token::Text("First.".to_string()),
                Token::Break(BreakSize::Medium),
                Token::Break(BreakSize::Tiny),
                Token::Text("Second.".to_string()),
            ]
        );
    }

    #[test]
    fn test_marker_text_excited_marker() {
        let tokens = segment_text("Calm. [excited] So great!");
        assert_eq!(
            tokens,
            vec![
                Token::Text("Calm.".to_string()),
                Token::StyleStart(StyleKind::Excited),
                Token::Text("So great!".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_sentences_mechanics() {
        assert_eq!(split_sentences("One. Two."), vec!["One.", "Two."]);
        assert_eq!(split_sentences("Hi!! Done."), vec!["Hi!!", "Done."]);
        assert_eq!(split_sentences("3.5 liters"), vec!["3.5 liters"]);
        assert_eq!(split_sentences("No terminator"), vec!["No terminator"]);
        assert_eq!(split_sentences("Wait... done."), vec!["Wait...", "done."]);
        assert!(split_sentences("").is_empty());
    }

    #[test]
    fn test_normalize_text_mechanics() {
        assert_eq!(normalize_text("  a \n b  "), "a b");
        assert_eq!(normalize_text("\t\n"), "");
        assert_eq!(normalize_text("plain"), "plain");
    }
}
