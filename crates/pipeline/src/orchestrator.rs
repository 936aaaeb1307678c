//! Narration pipeline orchestrator
//!
//! Coordinates chunking, cache lookup, concurrent synthesis, alignment,
//! duration measurement, and stitching for one narration request.
//!
//! Synthesis calls for distinct segments run concurrently up to a
//! configured limit and are individually cancellable; the stitcher then
//! consumes completed segments strictly in original index order.
//! Concurrent requests for the same cache key collapse to a single
//! provider call.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use narrator_cache::{CachedSegment, SegmentStore, SingleFlight};
use narrator_core::{
    DocumentTiming, DomWordToken, Error, GlobalWordBoundary, Result, SegmentAudio, SynthesisError,
};

use crate::chunker::{chunk_text, ChunkerConfig};
use crate::duration::measure_exact_duration;
use crate::matcher::{match_document, MatcherConfig};
use crate::stitcher::{stitch, SegmentNarration, StitchedNarration};
use crate::synthesis::{
    AudioFormat, SynthesisAdapter, SynthesisRequest, TimestampGranularity, build_word_boundaries,
};

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Chunker configuration
    #[serde(default)]
    pub chunker: ChunkerConfig,

    /// Matcher configuration
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// Voice identifier (already validated against the caller's tier)
    pub voice_id: String,

    /// Provider model identifier
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Requested audio format
    #[serde(default)]
    pub audio_format: AudioFormat,

    /// Maximum concurrent synthesis calls
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request synthesis timeout
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,
}

fn default_model_id() -> String {
    "multilingual-v2".to_string()
}

fn default_concurrency() -> usize {
    3
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

mod duration_secs {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

impl PipelineConfig {
    /// Configuration for a voice, defaults elsewhere
    pub fn for_voice(voice_id: impl Into<String>) -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            matcher: MatcherConfig::default(),
            voice_id: voice_id.into(),
            model_id: default_model_id(),
            audio_format: AudioFormat::default(),
            concurrency: default_concurrency(),
            request_timeout: default_request_timeout(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.voice_id.is_empty() {
            return Err(Error::Config("voice_id must not be empty".to_string()));
        }
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        if self.chunker.max_segment_chars == 0 {
            return Err(Error::Config("max_segment_chars must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Narration pipeline
pub struct NarrationPipeline {
    adapter: Arc<dyn SynthesisAdapter>,
    store: Arc<dyn SegmentStore>,
    single_flight: Arc<SingleFlight<CachedSegment, SynthesisError>>,
    semaphore: Arc<Semaphore>,
    config: PipelineConfig,
}

impl NarrationPipeline {
    pub fn new(
        adapter: Arc<dyn SynthesisAdapter>,
        store: Arc<dyn SegmentStore>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(config.concurrency)),
            single_flight: Arc::new(SingleFlight::new()),
            adapter,
            store,
            config,
        })
    }

    /// Narrate one text: chunk, resolve every segment (cache hit or
    /// synthesis), and stitch onto a single timeline.
    ///
    /// Cancelling `cancel` aborts all not-yet-completed segment calls;
    /// segments already completed or cache-hit stay cached. A failed
    /// segment surfaces as `Error::Segment` with its index and never
    /// invalidates sibling segments' cache entries.
    pub async fn narrate(&self, text: &str, cancel: &CancellationToken) -> Result<StitchedNarration> {
        let segments = chunk_text(text, &self.config.voice_id, &self.config.chunker);
        tracing::info!(
            segments = segments.len(),
            chars = text.chars().count(),
            voice = %self.config.voice_id,
            "narrating text"
        );

        let mut handles = Vec::with_capacity(segments.len());
        for segment in &segments {
            let job = SegmentJob {
                adapter: Arc::clone(&self.adapter),
                store: Arc::clone(&self.store),
                single_flight: Arc::clone(&self.single_flight),
                semaphore: Arc::clone(&self.semaphore),
                request: SynthesisRequest {
                    text: segment.text.clone(),
                    voice_id: self.config.voice_id.clone(),
                    model_id: self.config.model_id.clone(),
                    audio_format: self.config.audio_format,
                    timestamp_granularity: TimestampGranularity::Character,
                },
                cache_key: segment.cache_key.clone(),
                index: segment.index,
                timeout: self.config.request_timeout,
                cancel: cancel.child_token(),
            };
            handles.push(tokio::spawn(job.run()));
        }

        // The stitcher consumes completed segments strictly in original
        // index order, regardless of synthesis completion order.
        let mut narrated = Vec::with_capacity(segments.len());
        for (segment, handle) in segments.into_iter().zip(handles) {
            let resolved = handle
                .await
                .map_err(|_| Error::Segment {
                    index: segment.index,
                    source: SynthesisError::Cancelled,
                })?
                .map_err(|source| Error::Segment {
                    index: segment.index,
                    source,
                })?;

            let alignment = resolved.alignment.unwrap_or_default();
            let boundaries = build_word_boundaries(&alignment, &segment.text);
            let measured = measure_exact_duration(&resolved.audio);
            if measured.degraded {
                tracing::warn!(segment = segment.index, "segment duration estimated, not measured");
            }

            narrated.push(SegmentNarration {
                audio: SegmentAudio::new(resolved.audio, measured.duration_ms, measured.degraded),
                boundaries,
                segment,
            });
        }

        Ok(stitch(narrated))
    }

    /// Match rendered document tokens against stitched word boundaries
    /// for click-to-seek and progressive highlighting.
    pub fn match_document(
        &self,
        tokens: &[DomWordToken],
        boundaries: &[GlobalWordBoundary],
    ) -> DocumentTiming {
        match_document(tokens, boundaries, &self.config.matcher)
    }
}

/// Everything one segment resolution needs, detached from the pipeline's
/// lifetime so it can run on its own task.
struct SegmentJob {
    adapter: Arc<dyn SynthesisAdapter>,
    store: Arc<dyn SegmentStore>,
    single_flight: Arc<SingleFlight<CachedSegment, SynthesisError>>,
    semaphore: Arc<Semaphore>,
    request: SynthesisRequest,
    cache_key: String,
    index: usize,
    timeout: Duration,
    cancel: CancellationToken,
}

impl SegmentJob {
    async fn run(self) -> std::result::Result<CachedSegment, SynthesisError> {
        let SegmentJob {
            adapter,
            store,
            single_flight,
            semaphore,
            request,
            cache_key,
            index,
            timeout,
            cancel,
        } = self;

        // Cache lookup first: a hit costs no permit and no provider call.
        match store.get(&cache_key).await {
            Ok(Some(bytes)) => match CachedSegment::from_bytes(&bytes) {
                Ok(cached) => {
                    tracing::debug!(segment = index, "segment cache hit");
                    return Ok(cached);
                }
                Err(e) => {
                    tracing::warn!(segment = index, error = %e, "corrupt cache entry, re-synthesizing");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(segment = index, error = %e, "cache read failed, synthesizing without it");
            }
        }

        let key = cache_key.clone();
        single_flight
            .run(&cache_key, move || async move {
                let _permit = tokio::select! {
                    _ = cancel.cancelled() => return Err(SynthesisError::Cancelled),
                    permit = semaphore.acquire_owned() => {
                        permit.map_err(|_| SynthesisError::Cancelled)?
                    }
                };

                let output = tokio::select! {
                    _ = cancel.cancelled() => return Err(SynthesisError::Cancelled),
                    result = tokio::time::timeout(timeout, adapter.synthesize(&request, &cancel)) => {
                        match result {
                            Ok(output) => output?,
                            Err(_) => return Err(SynthesisError::Timeout(timeout)),
                        }
                    }
                };
                tracing::debug!(segment = index, bytes = output.audio.len(), "segment synthesized");

                let cached = CachedSegment::new(output.audio, output.alignment);
                // A cache write failure degrades reuse, never the request.
                match cached.to_bytes() {
                    Ok(bytes) => {
                        if let Err(e) = store.set(&key, bytes).await {
                            tracing::warn!(segment = index, error = %e, "cache write failed");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(segment = index, error = %e, "cache encode failed");
                    }
                }

                Ok(cached)
            })
            .await
    }
}
