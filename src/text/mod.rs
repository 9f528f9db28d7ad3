//! Text processing ahead of synthesis
//!
//! This module provides:
//! - Sentence segmentation over a pluggable tokenizer
//! - A UAX #29 tokenizer backed by `unicode-segmentation`

pub mod segmenter;

pub use segmenter::{
    segment, NodeKind, SentenceSegmenter, SentenceTokenizer, TextNode, UnicodeSentenceTokenizer,
};
