//! Segment store boundary and in-process implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use narrator_core::{CacheError, CharacterAlignment};

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

/// Key/value boundary implemented by the persistent cache backend.
///
/// Distinct keys proceed independently with no locking; collapsing
/// same-key requests is `SingleFlight`'s job, not the store's.
#[async_trait]
pub trait SegmentStore: Send + Sync {
    /// Fetch the payload for a key, if present
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store the payload for a key
    async fn set(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError>;
}

/// In-process segment store backed by a `HashMap`.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    pub stats: CacheStats,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: CacheStats::default(),
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SegmentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entry = self.entries.read().get(key).cloned();
        match entry {
            Some(bytes) => {
                self.stats.record_hit();
                Ok(Some(bytes))
            }
            None => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        self.entries.write().insert(key.to_string(), bytes);
        Ok(())
    }
}

/// Serialized metadata stored ahead of the audio bytes.
#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    alignment: Option<CharacterAlignment>,
}

/// The per-segment payload stored under a cache key.
///
/// Encoded as a little-endian length prefix, a JSON metadata header, then
/// the raw audio bytes. A pure-JSON envelope would base64-inflate the
/// audio payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSegment {
    pub audio: Vec<u8>,
    pub alignment: Option<CharacterAlignment>,
}

impl CachedSegment {
    pub fn new(audio: Vec<u8>, alignment: Option<CharacterAlignment>) -> Self {
        Self { audio, alignment }
    }

    /// Encode for storage
    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        let header = serde_json::to_vec(&EntryHeader {
            alignment: self.alignment.clone(),
        })
        .map_err(|e| CacheError::Store(e.to_string()))?;

        let mut out = Vec::with_capacity(4 + header.len() + self.audio.len());
        out.extend_from_slice(&(header.len() as u32).to_le_bytes());
        out.extend_from_slice(&header);
        out.extend_from_slice(&self.audio);
        Ok(out)
    }

    /// Decode a stored payload
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CacheError> {
        if bytes.len() < 4 {
            return Err(CacheError::CorruptEntry("payload shorter than length prefix".into()));
        }

        let header_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let body = &bytes[4..];
        if header_len > body.len() {
            return Err(CacheError::CorruptEntry(format!(
                "header length {} exceeds payload size {}",
                header_len,
                body.len()
            )));
        }

        let header: EntryHeader = serde_json::from_slice(&body[..header_len])
            .map_err(|e| CacheError::CorruptEntry(e.to_string()))?;

        Ok(Self {
            audio: body[header_len..].to_vec(),
            alignment: header.alignment,
        })
    }
}
