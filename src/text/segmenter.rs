//! Sentence segmentation for per-sentence synthesis
//!
//! Boundary detection is delegated to a [`SentenceTokenizer`]. The default
//! [`UnicodeSentenceTokenizer`] follows the UAX #29 sentence rules:
//! - `.`, `!` and `?` end a sentence when the next word starts with an
//!   uppercase letter (`"Hello world. How are you?"` splits in two)
//! - a terminator followed by a lowercase word does not split (`"e.g. this"`)
//! - a period between digits does not split (`"3.14"`)
//! - closing quotes and brackets stay with the sentence they close
//! - paragraph separators (newlines) always end a sentence

use std::sync::Arc;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

/// Kind of a node produced by a sentence tokenizer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Sentence content
    Sentence,
    /// Whitespace or other separator between sentences
    Separator,
}

/// A raw node produced by a sentence tokenizer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextNode {
    pub kind: NodeKind,
    pub raw_text: String,
}

impl TextNode {
    pub fn sentence(raw_text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Sentence,
            raw_text: raw_text.into(),
        }
    }

    pub fn separator(raw_text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Separator,
            raw_text: raw_text.into(),
        }
    }
}

/// External text-segmentation capability
///
/// Implementations must be deterministic: the same input always yields the
/// same nodes in the same order.
pub trait SentenceTokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<TextNode>;
}

/// UAX #29 sentence tokenizer
#[derive(Clone, Copy, Debug, Default)]
pub struct UnicodeSentenceTokenizer;

impl SentenceTokenizer for UnicodeSentenceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<TextNode> {
        text.split_sentence_bounds()
            .map(|bound| {
                if bound.trim().is_empty() {
                    TextNode::separator(bound)
                } else {
                    TextNode::sentence(bound)
                }
            })
            .collect()
    }
}

/// Splits text into trimmed, non-empty sentences
#[derive(Clone)]
pub struct SentenceSegmenter {
    tokenizer: Arc<dyn SentenceTokenizer>,
}

impl SentenceSegmenter {
    /// Create a segmenter using the UAX #29 tokenizer
    pub fn new() -> Self {
        Self::with_tokenizer(Arc::new(UnicodeSentenceTokenizer))
    }

    /// Create a segmenter over a custom tokenizer
    pub fn with_tokenizer(tokenizer: Arc<dyn SentenceTokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Segment text into sentences
    ///
    /// Returns an empty vector for empty or whitespace-only input.
    pub fn segment(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let sentences: Vec<String> = self
            .tokenizer
            .tokenize(text)
            .into_iter()
            .filter(|node| node.kind == NodeKind::Sentence)
            .map(|node| node.raw_text.trim().to_string())
            .filter(|sentence| !sentence.is_empty())
            .collect();

        debug!("Segmented {} chars into {} sentences", text.len(), sentences.len());
        sentences
    }
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SentenceSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentenceSegmenter").finish_non_exhaustive()
    }
}

/// Segment text with the default tokenizer
pub fn segment(text: &str) -> Vec<String> {
    SentenceSegmenter::new().segment(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_sentences() {
        assert_eq!(
            segment("Hello world. How are you?"),
            vec!["Hello world.".to_string(), "How are you?".to_string()]
        );
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(segment("").is_empty());
        assert!(segment("   \n\t  ").is_empty());
    }

    #[test]
    fn test_single_sentence_without_terminator() {
        assert_eq!(segment("  just some words  "), vec!["just some words".to_string()]);
    }

    #[test]
    fn test_sentences_are_trimmed_and_ordered() {
        let text = "First one!   Second one?\n\nThird one.";
        let sentences = segment(text);
        assert_eq!(sentences, vec!["First one!", "Second one?", "Third one."]);

        // Every sentence appears in the source, in order
        let mut cursor = 0;
        for sentence in &sentences {
            let found = text[cursor..].find(sentence.as_str()).expect("sentence in source");
            cursor += found + sentence.len();
        }
    }

    #[test]
    fn test_decimal_and_lowercase_continuation() {
        assert_eq!(segment("Pi is 3.14 roughly."), vec!["Pi is 3.14 roughly."]);
        assert_eq!(segment("Bring fruit, e.g. apples."), vec!["Bring fruit, e.g. apples."]);
    }

    #[test]
    fn test_deterministic() {
        let text = "One. Two! Three? Four.";
        assert_eq!(segment(text), segment(text));
    }

    #[test]
    fn test_tokenizer_round_trip() {
        let text = " Hello there.  General Kenobi!\n";
        let nodes = UnicodeSentenceTokenizer.tokenize(text);
        let rebuilt: String = nodes.iter().map(|n| n.raw_text.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    struct FixedTokenizer;

    impl SentenceTokenizer for FixedTokenizer {
        fn tokenize(&self, _text: &str) -> Vec<TextNode> {
            vec![
                TextNode::sentence(" a "),
                TextNode::separator("  "),
                TextNode::sentence("   "),
                TextNode::sentence("b"),
            ]
        }
    }

    #[test]
    fn test_custom_tokenizer_filters_separators_and_blanks() {
        let segmenter = SentenceSegmenter::with_tokenizer(Arc::new(FixedTokenizer));
        assert_eq!(segmenter.segment("ignored"), vec!["a", "b"]);
    }
}
