//! Word-level timing types
//!
//! The provider reports per-character timing; the pipeline folds it into
//! per-word boundaries, first relative to each segment's own audio, then
//! re-based onto the stitched global timeline.

use serde::{Deserialize, Serialize};

/// Per-character timing for one segment, as reported by the provider.
///
/// Parallel arrays: entry `i` of each array describes character `i` of the
/// synthesized text. May be absent from a provider response, or malformed
/// (mismatched lengths); both cases degrade to an empty alignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CharacterAlignment {
    pub characters: Vec<char>,
    pub start_sec: Vec<f64>,
    pub end_sec: Vec<f64>,
}

impl CharacterAlignment {
    /// All three arrays agree on length
    pub fn is_well_formed(&self) -> bool {
        self.characters.len() == self.start_sec.len()
            && self.characters.len() == self.end_sec.len()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

/// Word timing relative to its own segment's audio start.
///
/// Invariants: `start_ms <= end_ms`, boundaries are time-ordered within a
/// segment, and `char_offset` is non-decreasing across the boundary list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalWordBoundary {
    /// The word text as synthesized
    pub text: String,

    /// Start time in milliseconds from segment audio start
    pub start_ms: u64,

    /// End time in milliseconds from segment audio start
    pub end_ms: u64,

    /// Character offset of the word within the segment text
    pub char_offset: usize,

    /// Length of the word in characters
    pub char_len: usize,
}

impl LocalWordBoundary {
    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// A word boundary re-based onto the stitched global timeline.
///
/// Times are offset by the cumulative exact duration of all preceding
/// segments; the character offset is absolute into the full concatenated
/// text (segments joined by a single space).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalWordBoundary {
    /// The word text as synthesized
    pub text: String,

    /// Start time in milliseconds on the global timeline
    pub start_ms: u64,

    /// End time in milliseconds on the global timeline
    pub end_ms: u64,

    /// Character offset into the full concatenated text
    pub abs_char_offset: usize,

    /// Length of the word in characters
    pub char_len: usize,

    /// Index of the segment this word came from
    pub segment_index: usize,
}

impl GlobalWordBoundary {
    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}
