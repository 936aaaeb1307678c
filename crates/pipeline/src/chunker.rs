//! Sentence-aligned text chunking
//!
//! Splits cleaned input text into bounded segments for independent
//! synthesis, and computes the content-addressed cache key per segment.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use narrator_core::Segment;

/// Current cache key format version.
///
/// Bump when the cached representation changes in a way that makes old
/// entries' metadata wrong (e.g. duration semantics); the key space is
/// partitioned by version, so old entries are orphaned wholesale rather
/// than corrupted.
pub const FORMAT_VERSION: u32 = 2;

/// Chunker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum segment size in characters
    #[serde(default = "default_max_segment_chars")]
    pub max_segment_chars: usize,

    /// Cache key format version
    #[serde(default = "default_format_version")]
    pub format_version: u32,
}

fn default_max_segment_chars() -> usize {
    2400
}

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_segment_chars: default_max_segment_chars(),
            format_version: default_format_version(),
        }
    }
}

/// Split text into bounded, sentence-aligned segments.
///
/// Sentences are accumulated greedily until adding the next one would
/// exceed `max_segment_chars`. A text within the budget yields exactly one
/// segment equal to the input. A single sentence over the budget becomes
/// its own segment; the provider boundary owns hard length enforcement.
pub fn chunk_text(text: &str, voice_id: &str, config: &ChunkerConfig) -> Vec<Segment> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    if text.chars().count() <= config.max_segment_chars {
        let key = cache_key(config.format_version, text, voice_id);
        return vec![Segment::new(0, text, key)];
    }

    let mut texts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for sentence in split_sentences(text) {
        let sentence_chars = sentence.chars().count();

        if !current.is_empty() && current_chars + 1 + sentence_chars > config.max_segment_chars {
            texts.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(sentence);
        current_chars += sentence_chars;
    }
    if !current.is_empty() {
        texts.push(current);
    }

    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let key = cache_key(config.format_version, &text, voice_id);
            Segment::new(index, text, key)
        })
        .collect()
}

/// Deterministic cache key for one segment.
///
/// Identical `(version, text, voice)` always yields the identical key;
/// changing any one of the three changes the key.
pub fn cache_key(format_version: u32, text: &str, voice_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format_version.to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(text.as_bytes());
    hasher.update(b"\0");
    hasher.update(voice_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Split on sentence-ending punctuation followed by whitespace (or end of
/// text). Punctuation stays with its sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let end = i + c.len_utf8();
            let at_boundary = match chars.peek() {
                Some((_, next)) => next.is_whitespace(),
                None => true,
            };
            if at_boundary {
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_segment() {
        let config = ChunkerConfig::default();
        let segments = chunk_text("Hello world. Foo bar baz.", "voice-1", &config);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].index, 0);
        assert_eq!(segments[0].text, "Hello world. Foo bar baz.");
    }

    #[test]
    fn test_split_after_first_sentence() {
        let config = ChunkerConfig {
            max_segment_chars: 15,
            ..Default::default()
        };
        let segments = chunk_text("Hello world. Foo bar baz.", "voice-1", &config);

        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello world.", "Foo bar baz."]);
        assert_eq!(segments[0].index, 0);
        assert_eq!(segments[1].index, 1);
    }

    #[test]
    fn test_greedy_accumulation() {
        let config = ChunkerConfig {
            max_segment_chars: 30,
            ..Default::default()
        };
        let segments = chunk_text("One two. Three four. Five six seven eight nine ten!", "v", &config);

        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["One two. Three four.", "Five six seven eight nine ten!"]);
    }

    #[test]
    fn test_oversize_sentence_kept_whole() {
        let config = ChunkerConfig {
            max_segment_chars: 10,
            ..Default::default()
        };
        let segments = chunk_text("Short. This sentence is much longer than the budget. End.", "v", &config);

        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Short.", "This sentence is much longer than the budget.", "End."]
        );
    }

    #[test]
    fn test_empty_text() {
        let config = ChunkerConfig::default();
        assert!(chunk_text("", "v", &config).is_empty());
        assert!(chunk_text("   \n ", "v", &config).is_empty());
    }

    #[test]
    fn test_tail_without_terminator() {
        let config = ChunkerConfig {
            max_segment_chars: 12,
            ..Default::default()
        };
        let segments = chunk_text("First one here. trailing words", "v", &config);

        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["First one here.", "trailing words"]);
    }

    #[test]
    fn test_cache_key_deterministic() {
        let a = cache_key(2, "Hello world.", "voice-1");
        let b = cache_key(2, "Hello world.", "voice-1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_key_sensitivity() {
        let base = cache_key(2, "Hello world.", "voice-1");
        assert_ne!(base, cache_key(3, "Hello world.", "voice-1"));
        assert_ne!(base, cache_key(2, "Hello world!", "voice-1"));
        assert_ne!(base, cache_key(2, "Hello world.", "voice-2"));
    }

    #[test]
    fn test_cache_key_field_separation() {
        // Field boundaries must not be ambiguous under concatenation
        assert_ne!(cache_key(1, "2abc", "v"), cache_key(12, "abc", "v"));
        assert_ne!(cache_key(1, "abcv", ""), cache_key(1, "abc", "v"));
    }
}
