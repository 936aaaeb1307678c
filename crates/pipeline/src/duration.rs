//! Exact duration measurement for compressed audio
//!
//! Parses the MPEG audio frame structure directly instead of trusting
//! alignment data or byte-rate arithmetic: each (version, layer) pair has
//! a fixed samples-per-frame constant, so summing `samples / sample_rate`
//! over every valid frame gives the true playback length for both
//! constant- and variable-bitrate streams. Alignment-derived duration
//! excludes trailing silence and under-counts, which shows up as
//! cumulative drift once segments are stitched.
//!
//! Stateless, so alternate container formats can be added by implementing
//! the same measure contract.

/// Bitrate used for the degraded byte-length estimate when no valid
/// frames are found
const FALLBACK_BITRATE_BITS_PER_SEC: u64 = 128_000;

/// Bitrates in kbps, indexed by the header bitrate field.
/// Index 0 is "free format" (unsupported) and 15 is invalid.
const BITRATE_V1_L1: [u32; 15] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448];
const BITRATE_V1_L2: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
const BITRATE_V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATE_V2_L1: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
const BITRATE_V2_L2_L3: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

/// Result of measuring one segment's audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationMeasurement {
    /// Playback duration in milliseconds
    pub duration_ms: u64,

    /// True when the value is a byte-rate estimate because no valid
    /// frames were found
    pub degraded: bool,

    /// Number of valid frames accumulated
    pub frame_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct FrameInfo {
    samples_per_frame: u32,
    sample_rate: u32,
    frame_len: usize,
}

/// Measure the exact playback duration of an MPEG audio stream.
///
/// Skips a leading ID3v2 tag if present, then scans for frame sync and
/// accumulates per-frame duration. Bytes that do not parse as a frame
/// header are skipped one at a time, so junk between frames does not
/// abort the scan. Zero valid frames (corrupt or unsupported format)
/// falls back to a byte-length estimate flagged as degraded; this is
/// non-fatal by design.
pub fn measure_exact_duration(bytes: &[u8]) -> DurationMeasurement {
    let mut pos = id3v2_tag_len(bytes);
    let mut seconds = 0.0f64;
    let mut frame_count = 0usize;

    while pos + 4 <= bytes.len() {
        match parse_frame_header(&bytes[pos..]) {
            Some(frame) => {
                seconds += frame.samples_per_frame as f64 / frame.sample_rate as f64;
                frame_count += 1;
                pos += frame.frame_len;
            }
            None => pos += 1,
        }
    }

    if frame_count == 0 {
        let duration_ms = (bytes.len() as u64 * 8 * 1000) / FALLBACK_BITRATE_BITS_PER_SEC;
        tracing::warn!(
            bytes = bytes.len(),
            duration_ms,
            "no valid MPEG frames found, falling back to byte-rate estimate"
        );
        return DurationMeasurement {
            duration_ms,
            degraded: true,
            frame_count: 0,
        };
    }

    DurationMeasurement {
        duration_ms: (seconds * 1000.0).round() as u64,
        degraded: false,
        frame_count,
    }
}

/// Length of a leading ID3v2 tag, or 0 when none is present.
///
/// The tag size is a 28-bit syncsafe integer; header flag bit 4 signals a
/// 10-byte footer after the body.
pub fn id3v2_tag_len(bytes: &[u8]) -> usize {
    if bytes.len() < 10 || &bytes[0..3] != b"ID3" {
        return 0;
    }

    let size = ((bytes[6] as usize & 0x7F) << 21)
        | ((bytes[7] as usize & 0x7F) << 14)
        | ((bytes[8] as usize & 0x7F) << 7)
        | (bytes[9] as usize & 0x7F);
    let footer = if bytes[5] & 0x10 != 0 { 10 } else { 0 };

    (10 + size + footer).min(bytes.len())
}

/// Decode one frame header at the start of `bytes`.
///
/// Header layout: 11 sync bits, 2 version bits (0 = MPEG2.5, 1 reserved,
/// 2 = MPEG2, 3 = MPEG1), 2 layer bits (0 reserved, 1 = Layer III,
/// 2 = Layer II, 3 = Layer I), then bitrate index, sample-rate index and
/// padding bit in the third byte.
fn parse_frame_header(bytes: &[u8]) -> Option<FrameInfo> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] & 0xE0 != 0xE0 {
        return None;
    }

    let version = (bytes[1] >> 3) & 0x03;
    let layer = (bytes[1] >> 1) & 0x03;
    if version == 1 || layer == 0 {
        return None;
    }

    let bitrate_index = (bytes[2] >> 4) as usize;
    let sample_rate_index = ((bytes[2] >> 2) & 0x03) as usize;
    let padding = ((bytes[2] >> 1) & 0x01) as u32;
    if bitrate_index == 0 || bitrate_index == 15 || sample_rate_index == 3 {
        return None;
    }

    let sample_rate = match version {
        3 => [44100, 48000, 32000],
        2 => [22050, 24000, 16000],
        _ => [11025, 12000, 8000],
    }[sample_rate_index];

    let kbps = if version == 3 {
        (match layer {
            3 => BITRATE_V1_L1,
            2 => BITRATE_V1_L2,
            _ => BITRATE_V1_L3,
        })[bitrate_index]
    } else {
        (match layer {
            3 => BITRATE_V2_L1,
            _ => BITRATE_V2_L2_L3,
        })[bitrate_index]
    };
    let bitrate = kbps * 1000;

    // Samples per frame depend only on version and layer, never bitrate.
    let (samples_per_frame, frame_len) = if layer == 3 {
        let len = ((12 * bitrate / sample_rate + padding) * 4) as usize;
        (384, len)
    } else {
        let samples: u32 = if layer == 2 || version == 3 { 1152 } else { 576 };
        let len = (samples / 8 * bitrate / sample_rate + padding) as usize;
        (samples, len)
    };

    if frame_len < 4 {
        return None;
    }

    Some(FrameInfo {
        samples_per_frame,
        sample_rate,
        frame_len,
    })
}
