//! Synthesis provider boundary
//!
//! The narration engine is remote: one request per segment, raw audio
//! bytes back, optionally with per-character timing. The concrete HTTP
//! transport lives outside this repo; here we define the contract it
//! implements and the wire-shape decoding.

mod alignment;

pub use alignment::build_word_boundaries;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use narrator_core::{CharacterAlignment, SynthesisError};

/// Compressed output format requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(non_camel_case_types)]
pub enum AudioFormat {
    Mp3_22050_32,
    Mp3_44100_128,
    Mp3_44100_192,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3_22050_32 => "mp3_22050_32",
            Self::Mp3_44100_128 => "mp3_44100_128",
            Self::Mp3_44100_192 => "mp3_44100_192",
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::Mp3_44100_128
    }
}

/// Timing granularity requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampGranularity {
    Character,
}

/// One synthesis request, covering a single segment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub model_id: String,
    pub audio_format: AudioFormat,
    pub timestamp_granularity: TimestampGranularity,
}

/// Decoded synthesis result for one segment
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    /// Compressed audio bytes
    pub audio: Vec<u8>,

    /// Per-character timing; `None` when the provider omitted it (valid,
    /// degrades to an empty word boundary list downstream)
    pub alignment: Option<CharacterAlignment>,
}

/// Provider wire response, before payload decoding
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    pub audio_base64: String,

    #[serde(default)]
    pub character_alignment: Option<ProviderAlignment>,
}

/// Per-character timing as the provider ships it: one single-character
/// string per entry, parallel time arrays in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAlignment {
    pub characters: Vec<String>,
    pub start_sec: Vec<f64>,
    pub end_sec: Vec<f64>,
}

impl ProviderResponse {
    /// Decode the wire payload.
    ///
    /// A missing or invalid audio payload is fatal for the segment. A
    /// missing or malformed alignment is not: it decodes to `None`.
    pub fn decode(self) -> Result<SynthesisOutput, SynthesisError> {
        let audio = BASE64
            .decode(self.audio_base64.as_bytes())
            .map_err(|e| SynthesisError::MalformedResponse(format!("audio payload: {e}")))?;
        if audio.is_empty() {
            return Err(SynthesisError::MalformedResponse("empty audio payload".into()));
        }

        let alignment = self.character_alignment.and_then(decode_alignment);

        Ok(SynthesisOutput { audio, alignment })
    }
}

/// Validate and convert provider alignment; any malformation yields `None`.
fn decode_alignment(raw: ProviderAlignment) -> Option<CharacterAlignment> {
    if raw.characters.len() != raw.start_sec.len() || raw.characters.len() != raw.end_sec.len() {
        tracing::debug!(
            characters = raw.characters.len(),
            starts = raw.start_sec.len(),
            ends = raw.end_sec.len(),
            "alignment arrays disagree on length, dropping alignment"
        );
        return None;
    }

    let mut characters = Vec::with_capacity(raw.characters.len());
    for entry in &raw.characters {
        let mut chars = entry.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => characters.push(c),
            _ => {
                tracing::debug!(entry = %entry, "non-single-character alignment entry, dropping alignment");
                return None;
            }
        }
    }

    Some(CharacterAlignment {
        characters,
        start_sec: raw.start_sec,
        end_sec: raw.end_sec,
    })
}

/// Boundary to the external narration engine.
///
/// Implementations take their configuration (credentials, endpoint)
/// explicitly at construction, must respect cancellation (abort the
/// in-flight call, return no partial bytes), and must never silently
/// return corrupt audio: a non-success response becomes a typed error
/// distinguishing timeout from provider-reported failure.
#[async_trait]
pub trait SynthesisAdapter: Send + Sync {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        cancel: &CancellationToken,
    ) -> Result<SynthesisOutput, SynthesisError>;
}
