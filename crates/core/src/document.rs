//! Document tokens and match results
//!
//! The rendered document is externally owned; a DOM-walking collaborator
//! supplies its literal word tokens in reading order. The pipeline only
//! reads the token list and returns indices into it.

use serde::{Deserialize, Serialize};

/// A literal word position in the externally rendered content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomWordToken {
    /// The rendered word text, exactly as displayed
    pub text: String,

    /// Opaque reference into the rendered document (owned by the document
    /// collaborator, carried through untouched)
    pub position_ref: String,
}

impl DomWordToken {
    pub fn new(text: impl Into<String>, position_ref: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position_ref: position_ref.into(),
        }
    }
}

/// Timing assigned to one DOM token.
///
/// An explicit two-variant result: a token either matched an alignment word
/// and carries its timing, or received timing interpolated between its
/// nearest matched neighbors. Invalid states cannot be mistaken for real
/// timings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TokenTiming {
    /// Timing taken from a matched alignment word
    Matched {
        start_ms: u64,
        end_ms: u64,
        /// Index of the matched word in the global alignment list
        alignment_index: usize,
    },

    /// Timing distributed linearly between neighboring matches
    Interpolated { start_ms: u64, end_ms: u64 },
}

impl TokenTiming {
    pub fn start_ms(&self) -> u64 {
        match self {
            Self::Matched { start_ms, .. } | Self::Interpolated { start_ms, .. } => *start_ms,
        }
    }

    pub fn end_ms(&self) -> u64 {
        match self {
            Self::Matched { end_ms, .. } | Self::Interpolated { end_ms, .. } => *end_ms,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Total function from alignment-word index to DOM-token index.
///
/// Non-decreasing as the alignment index increases: no mapping ever points
/// backward relative to a later index's mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlignmentToDomMap(Vec<usize>);

impl AlignmentToDomMap {
    pub fn new(map: Vec<usize>) -> Self {
        Self(map)
    }

    /// DOM-token index for an alignment-word index
    pub fn get(&self, alignment_index: usize) -> Option<usize> {
        self.0.get(alignment_index).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Every alignment index maps to the DOM index of the same value
    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &dom)| i == dom)
    }
}

/// Per-token timing plus the reverse map, built once per playback session
/// (rebuilt if the document re-renders).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTiming {
    /// One timing per DOM token, in reading order
    pub token_timings: Vec<TokenTiming>,

    /// Reverse map for click-to-seek
    pub alignment_to_dom: AlignmentToDomMap,

    /// Number of tokens matched directly (not interpolated)
    pub matched_count: usize,

    /// True when some tokens ended up interpolated rather than matched
    pub matching_incomplete: bool,
}
