//! Content-addressed segment cache
//!
//! This crate provides the cache boundary for synthesized segments:
//! - `SegmentStore`: the trait a persistent key/value backend implements
//! - `MemoryStore`: in-process implementation for tests and small deployments
//! - `CachedSegment`: the audio+alignment payload stored per cache key
//! - `SingleFlight`: collapses concurrent requests for the same key into
//!   one underlying computation
//!
//! Keys are content-addressed (hash of format version, segment text, and
//! voice), so the key space is partitioned by format version: a version
//! bump orphans old entries rather than corrupting them.

mod single_flight;
mod store;

pub use single_flight::SingleFlight;
pub use store::{CacheStats, CachedSegment, MemoryStore, SegmentStore};
