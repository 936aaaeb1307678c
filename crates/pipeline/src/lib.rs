//! Article narration pipeline
//!
//! Turns cleaned article text into narrated audio with word-level highlight
//! synchronization:
//! - Sentence-aligned chunking with content-addressed cache keys
//! - Synthesis provider boundary with per-character timing
//! - Per-word alignment, exact frame-level duration measurement
//! - Multi-segment stitching onto one global timeline
//! - Fuzzy matching of alignment words against rendered document tokens

pub mod chunker;
pub mod duration;
pub mod matcher;
pub mod orchestrator;
pub mod stitcher;
pub mod synthesis;

pub use chunker::{cache_key, chunk_text, ChunkerConfig};
pub use duration::{measure_exact_duration, DurationMeasurement};
pub use matcher::{match_document, MatcherConfig};
pub use orchestrator::{NarrationPipeline, PipelineConfig};
pub use stitcher::{stitch, SegmentNarration, StitchedNarration};
pub use synthesis::{
    build_word_boundaries, AudioFormat, ProviderResponse, SynthesisAdapter, SynthesisOutput,
    SynthesisRequest, TimestampGranularity,
};
