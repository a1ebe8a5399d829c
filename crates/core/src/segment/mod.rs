mod chunker;
mod parser;

use crate::emotion::Emotion;
use serde::{Deserialize, Serialize};

pub use chunker::{chunk_segments, chunk_text};
pub use parser::parse_segments;

/// A contiguous span of text tagged with one emotion, the unit of
/// synthesis. `order` is the sole reassembly anchor and must be
/// preserved end-to-end.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextSegment {
    pub emotion: Emotion,
    pub text: String,
    pub order: usize,
}

impl TextSegment {
    pub fn new(emotion: Emotion, text: impl Into<String>, order: usize) -> Self {
        Self {
            emotion,
            text: text.into(),
            order,
        }
    }
}
