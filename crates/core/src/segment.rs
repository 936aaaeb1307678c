//! Text segments and their synthesized audio

use serde::{Deserialize, Serialize};

/// A bounded, sentence-aligned slice of the input text, synthesized
/// independently of its siblings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    /// Position in the original text (0-based)
    pub index: usize,

    /// The segment text
    pub text: String,

    /// Content-addressed cache key: hash of (format version, text, voice)
    pub cache_key: String,
}

impl Segment {
    pub fn new(index: usize, text: impl Into<String>, cache_key: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            cache_key: cache_key.into(),
        }
    }

    /// Length of the segment text in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Raw synthesized audio for one segment.
///
/// `exact_duration_ms` comes from frame-level measurement of the compressed
/// stream, never from word boundaries: boundary-derived duration excludes
/// trailing silence and under-counts true length.
#[derive(Debug, Clone)]
pub struct SegmentAudio {
    /// Compressed audio bytes as returned by the provider
    pub bytes: Vec<u8>,

    /// Measured playback duration in milliseconds
    pub exact_duration_ms: u64,

    /// True when the duration is a byte-rate estimate rather than a
    /// frame-level measurement
    pub duration_degraded: bool,
}

impl SegmentAudio {
    pub fn new(bytes: Vec<u8>, exact_duration_ms: u64, duration_degraded: bool) -> Self {
        Self {
            bytes,
            exact_duration_ms,
            duration_degraded,
        }
    }
}
