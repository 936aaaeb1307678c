//! Per-character timing to per-word boundaries
//!
//! Pure fold over the provider's character alignment: consecutive
//! non-whitespace characters accumulate into a word, whitespace flushes
//! it. A word's start is its first character's start time, its end the
//! last character's end time.

use narrator_core::{CharacterAlignment, LocalWordBoundary};

/// Convert per-character timing into segment-local word boundaries.
///
/// Character offsets are found by forward-searching the segment text from
/// the end of the previously placed word, so repeated words resolve to
/// their own positions; the search never moves backward. An empty or
/// malformed alignment yields an empty list, not an error.
pub fn build_word_boundaries(
    alignment: &CharacterAlignment,
    segment_text: &str,
) -> Vec<LocalWordBoundary> {
    if alignment.is_empty() || !alignment.is_well_formed() {
        return Vec::new();
    }

    let text_chars: Vec<char> = segment_text.chars().collect();
    let mut boundaries = Vec::new();
    let mut word = String::new();
    let mut start_sec = 0.0;
    let mut end_sec = 0.0;
    let mut search_from = 0usize;

    for i in 0..alignment.len() {
        let c = alignment.characters[i];
        if c.is_whitespace() {
            flush_word(&mut word, start_sec, end_sec, &text_chars, &mut search_from, &mut boundaries);
        } else {
            if word.is_empty() {
                start_sec = alignment.start_sec[i];
            }
            end_sec = alignment.end_sec[i];
            word.push(c);
        }
    }
    flush_word(&mut word, start_sec, end_sec, &text_chars, &mut search_from, &mut boundaries);

    boundaries
}

fn flush_word(
    word: &mut String,
    start_sec: f64,
    end_sec: f64,
    text_chars: &[char],
    search_from: &mut usize,
    boundaries: &mut Vec<LocalWordBoundary>,
) {
    if word.is_empty() {
        return;
    }

    let char_len = word.chars().count();
    let char_offset = match find_from(text_chars, word, *search_from) {
        Some(at) => {
            *search_from = at + char_len;
            at
        }
        // The provider normalized the word away from the literal text;
        // the previous word's end keeps the offsets monotonic.
        None => *search_from,
    };

    let start_ms = (start_sec * 1000.0).round() as u64;
    let end_ms = (end_sec * 1000.0).round() as u64;
    boundaries.push(LocalWordBoundary {
        text: std::mem::take(word),
        start_ms,
        end_ms: end_ms.max(start_ms),
        char_offset,
        char_len,
    });
}

/// First occurrence of `needle` in `haystack` at or after `from`,
/// in character positions.
fn find_from(haystack: &[char], needle: &str, from: usize) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle.as_slice())
        .map(|p| from + p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment_for(text: &str, char_duration_sec: f64) -> CharacterAlignment {
        let characters: Vec<char> = text.chars().collect();
        let start_sec: Vec<f64> = (0..characters.len())
            .map(|i| i as f64 * char_duration_sec)
            .collect();
        let end_sec: Vec<f64> = (0..characters.len())
            .map(|i| (i + 1) as f64 * char_duration_sec)
            .collect();
        CharacterAlignment {
            characters,
            start_sec,
            end_sec,
        }
    }

    #[test]
    fn test_single_word() {
        let boundaries = build_word_boundaries(&alignment_for("hello", 0.05), "hello");

        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].text, "hello");
        assert_eq!(boundaries[0].start_ms, 0);
        assert_eq!(boundaries[0].end_ms, 250);
        assert_eq!(boundaries[0].char_offset, 0);
        assert_eq!(boundaries[0].char_len, 5);
    }

    #[test]
    fn test_whitespace_flushes_words() {
        let boundaries = build_word_boundaries(&alignment_for("hi yo", 0.1), "hi yo");

        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].text, "hi");
        assert_eq!(boundaries[0].start_ms, 0);
        assert_eq!(boundaries[0].end_ms, 200);
        assert_eq!(boundaries[1].text, "yo");
        assert_eq!(boundaries[1].start_ms, 300);
        assert_eq!(boundaries[1].end_ms, 500);
        assert_eq!(boundaries[1].char_offset, 3);
    }

    #[test]
    fn test_repeated_words_advance() {
        let text = "the cat the dog";
        let boundaries = build_word_boundaries(&alignment_for(text, 0.05), text);

        let offsets: Vec<usize> = boundaries.iter().map(|b| b.char_offset).collect();
        assert_eq!(offsets, vec![0, 4, 8, 12]);
    }

    #[test]
    fn test_empty_alignment() {
        assert!(build_word_boundaries(&CharacterAlignment::default(), "text").is_empty());
    }

    #[test]
    fn test_malformed_alignment_treated_as_empty() {
        let malformed = CharacterAlignment {
            characters: vec!['a', 'b'],
            start_sec: vec![0.0],
            end_sec: vec![0.1, 0.2],
        };
        assert!(build_word_boundaries(&malformed, "ab").is_empty());
    }

    #[test]
    fn test_normalized_word_missing_from_text() {
        // The provider expanded "$5" into spoken words that never appear
        // in the literal text; offsets must stay monotonic regardless.
        let spoken = "costs five dollars";
        let boundaries = build_word_boundaries(&alignment_for(spoken, 0.05), "costs $5");

        assert_eq!(boundaries.len(), 3);
        let offsets: Vec<usize> = boundaries.iter().map(|b| b.char_offset).collect();
        assert_eq!(offsets[0], 0);
        for pair in offsets.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_boundaries_time_ordered() {
        let text = "one two three";
        let boundaries = build_word_boundaries(&alignment_for(text, 0.04), text);

        for pair in boundaries.windows(2) {
            assert!(pair[0].end_ms <= pair[1].start_ms);
        }
        for b in &boundaries {
            assert!(b.start_ms <= b.end_ms);
        }
    }
}
