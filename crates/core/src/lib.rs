//! Core types for the article narration pipeline
//!
//! This crate provides foundational types used across all other crates:
//! - Text segments and their cache identity
//! - Word-level timing (segment-local and global)
//! - Document tokens and match results
//! - Error types

pub mod document;
pub mod error;
pub mod segment;
pub mod timing;

pub use document::{AlignmentToDomMap, DocumentTiming, DomWordToken, TokenTiming};
pub use error::{CacheError, Error, Result, SynthesisError};
pub use segment::{Segment, SegmentAudio};
pub use timing::{CharacterAlignment, GlobalWordBoundary, LocalWordBoundary};
