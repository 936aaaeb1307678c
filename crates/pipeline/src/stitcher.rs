//! Timeline stitching
//!
//! Concatenates segment audio in original order and re-bases every
//! segment-local word boundary onto one global timeline, using the exact
//! measured duration of each preceding segment as the offset. Word
//! boundaries must never be used for offsetting here: they exclude
//! trailing silence, and the error compounds across segments.

use narrator_core::{GlobalWordBoundary, LocalWordBoundary, Segment, SegmentAudio};

use crate::duration::id3v2_tag_len;

/// One segment ready for stitching
#[derive(Debug, Clone)]
pub struct SegmentNarration {
    pub segment: Segment,
    pub audio: SegmentAudio,
    pub boundaries: Vec<LocalWordBoundary>,
}

/// The combined narration stream
#[derive(Debug, Clone)]
pub struct StitchedNarration {
    /// Concatenated audio with a fresh container duration tag
    pub audio: Vec<u8>,

    /// All word boundaries on the global timeline, in reading order
    pub boundaries: Vec<GlobalWordBoundary>,

    /// Sum of exact segment durations
    pub total_duration_ms: u64,

    /// True when any segment's duration was estimated rather than measured
    pub degraded: bool,
}

/// Stitch segments into one stream.
///
/// Segments are processed strictly in index order regardless of the order
/// synthesis completed in. Each segment's ID3v2 tag (if any) is stripped
/// before appending, and one fresh tag is prepended whose TLEN frame
/// carries the summed exact duration, so players report the whole
/// stream's length rather than only the first segment's.
///
/// Absolute character offsets account for one joining space between
/// consecutive segment texts.
pub fn stitch(mut segments: Vec<SegmentNarration>) -> StitchedNarration {
    segments.sort_by_key(|s| s.segment.index);

    let mut offset_ms: u64 = 0;
    let mut char_base: usize = 0;
    let mut body = Vec::new();
    let mut boundaries = Vec::new();
    let mut degraded = false;

    for seg in &segments {
        let audio = &seg.audio.bytes[id3v2_tag_len(&seg.audio.bytes)..];
        body.extend_from_slice(audio);

        for b in &seg.boundaries {
            boundaries.push(GlobalWordBoundary {
                text: b.text.clone(),
                start_ms: b.start_ms + offset_ms,
                end_ms: b.end_ms + offset_ms,
                abs_char_offset: char_base + b.char_offset,
                char_len: b.char_len,
                segment_index: seg.segment.index,
            });
        }

        offset_ms += seg.audio.exact_duration_ms;
        char_base += seg.segment.char_len() + 1;
        degraded |= seg.audio.duration_degraded;
    }

    tracing::debug!(
        segments = segments.len(),
        total_duration_ms = offset_ms,
        words = boundaries.len(),
        "stitched narration"
    );

    let mut audio = build_duration_tag(offset_ms);
    audio.extend_from_slice(&body);

    StitchedNarration {
        audio,
        boundaries,
        total_duration_ms: offset_ms,
        degraded,
    }
}

/// Minimal ID3v2.3 tag holding a single TLEN text frame with the stream
/// duration in milliseconds.
fn build_duration_tag(total_ms: u64) -> Vec<u8> {
    let value = total_ms.to_string();
    let frame_body_len = 1 + value.len(); // text encoding byte + digits
    let body_len = 10 + frame_body_len;

    let mut tag = Vec::with_capacity(10 + body_len);
    tag.extend_from_slice(b"ID3");
    tag.extend_from_slice(&[0x03, 0x00]); // v2.3.0
    tag.push(0x00);
    tag.extend_from_slice(&syncsafe(body_len as u32));

    tag.extend_from_slice(b"TLEN");
    tag.extend_from_slice(&(frame_body_len as u32).to_be_bytes());
    tag.extend_from_slice(&[0x00, 0x00]);
    tag.push(0x00); // ISO-8859-1
    tag.extend_from_slice(value.as_bytes());

    tag
}

fn syncsafe(v: u32) -> [u8; 4] {
    [
        ((v >> 21) & 0x7F) as u8,
        ((v >> 14) & 0x7F) as u8,
        ((v >> 7) & 0x7F) as u8,
        (v & 0x7F) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::measure_exact_duration;

    fn boundary(text: &str, start_ms: u64, end_ms: u64, char_offset: usize) -> LocalWordBoundary {
        LocalWordBoundary {
            text: text.to_string(),
            start_ms,
            end_ms,
            char_offset,
            char_len: text.chars().count(),
        }
    }

    fn narration(
        index: usize,
        text: &str,
        duration_ms: u64,
        boundaries: Vec<LocalWordBoundary>,
    ) -> SegmentNarration {
        SegmentNarration {
            segment: Segment::new(index, text, format!("key-{index}")),
            audio: SegmentAudio::new(vec![0u8; 16], duration_ms, false),
            boundaries,
        }
    }

    /// MPEG1 Layer I, 32 kHz, 256 kbps: exactly 12 ms per 384-byte frame
    fn l1_frames(count: usize) -> Vec<u8> {
        let mut stream = Vec::new();
        for _ in 0..count {
            let mut frame = vec![0u8; 384];
            frame[0] = 0xFF;
            frame[1] = 0xFF;
            frame[2] = 0x88;
            stream.extend_from_slice(&frame);
        }
        stream
    }

    #[test]
    fn test_boundaries_offset_by_exact_duration() {
        let stitched = stitch(vec![
            narration(0, "Hello world.", 1000, vec![
                boundary("Hello", 0, 400, 0),
                boundary("world.", 450, 800, 6),
            ]),
            narration(1, "Foo bar.", 2000, vec![
                boundary("Foo", 0, 300, 0),
                boundary("bar.", 350, 700, 4),
            ]),
        ]);

        assert_eq!(stitched.total_duration_ms, 3000);
        for b in stitched.boundaries.iter().filter(|b| b.segment_index == 0) {
            assert!(b.end_ms <= 1000);
        }
        for b in stitched.boundaries.iter().filter(|b| b.segment_index == 1) {
            assert!(b.start_ms >= 1000);
        }
    }

    #[test]
    fn test_absolute_char_offsets_include_join_space() {
        let stitched = stitch(vec![
            narration(0, "Hello world.", 900, vec![boundary("Hello", 0, 400, 0)]),
            narration(1, "Foo bar baz.", 1400, vec![boundary("Foo", 0, 300, 0)]),
        ]);

        // "Hello world." is 12 chars; "Foo" starts after it and one space
        assert_eq!(stitched.boundaries[1].abs_char_offset, 13);
    }

    #[test]
    fn test_out_of_order_input_sorted_by_index() {
        let stitched = stitch(vec![
            narration(1, "Second.", 500, vec![boundary("Second.", 0, 400, 0)]),
            narration(0, "First.", 700, vec![boundary("First.", 0, 600, 0)]),
        ]);

        assert_eq!(stitched.boundaries[0].text, "First.");
        assert_eq!(stitched.boundaries[0].start_ms, 0);
        assert_eq!(stitched.boundaries[1].text, "Second.");
        assert_eq!(stitched.boundaries[1].start_ms, 700);
    }

    #[test]
    fn test_duration_tag_round_trips_through_analyzer() {
        let seg0 = SegmentNarration {
            segment: Segment::new(0, "One.", "key-0"),
            audio: SegmentAudio::new(l1_frames(75), 900, false),
            boundaries: Vec::new(),
        };
        let seg1 = SegmentNarration {
            segment: Segment::new(1, "Two.", "key-1"),
            audio: SegmentAudio::new(l1_frames(50), 600, false),
            boundaries: Vec::new(),
        };

        let stitched = stitch(vec![seg0, seg1]);
        assert_eq!(stitched.total_duration_ms, 1500);

        // The prepended tag is skipped by the analyzer; every frame from
        // both segments is still reachable behind it
        let measured = measure_exact_duration(&stitched.audio);
        assert!(!measured.degraded);
        assert_eq!(measured.frame_count, 125);
        assert_eq!(measured.duration_ms, 1500);
    }

    #[test]
    fn test_segment_tags_stripped() {
        let mut tagged = vec![0u8; 10];
        tagged[0..3].copy_from_slice(b"ID3");
        tagged[3] = 0x03;
        // zero-size tag body; frames follow immediately
        tagged.extend_from_slice(&l1_frames(10));

        let stitched = stitch(vec![SegmentNarration {
            segment: Segment::new(0, "Tagged.", "key"),
            audio: SegmentAudio::new(tagged, 120, false),
            boundaries: Vec::new(),
        }]);

        // Exactly one tag: the fresh one at the front
        let measured = measure_exact_duration(&stitched.audio);
        assert_eq!(measured.frame_count, 10);
        let body = &stitched.audio[id3v2_tag_len(&stitched.audio)..];
        assert_ne!(&body[0..3], b"ID3");
    }

    #[test]
    fn test_tlen_frame_contents() {
        let stitched = stitch(vec![narration(0, "Hi.", 2300, Vec::new())]);

        let tag_len = id3v2_tag_len(&stitched.audio);
        let tag = &stitched.audio[..tag_len];
        assert_eq!(&tag[10..14], b"TLEN");
        let frame_len = u32::from_be_bytes([tag[14], tag[15], tag[16], tag[17]]) as usize;
        let text = std::str::from_utf8(&tag[21..20 + frame_len]).unwrap();
        assert_eq!(text, "2300");
    }

    #[test]
    fn test_degraded_flag_propagates() {
        let mut seg = narration(0, "Hi.", 100, Vec::new());
        seg.audio.duration_degraded = true;

        assert!(stitch(vec![seg]).degraded);
        assert!(!stitch(vec![narration(0, "Hi.", 100, Vec::new())]).degraded);
    }

    #[test]
    fn test_empty_input() {
        let stitched = stitch(Vec::new());
        assert_eq!(stitched.total_duration_ms, 0);
        assert!(stitched.boundaries.is_empty());
    }
}
