//! Document matching
//!
//! Aligns the provider's (possibly text-normalized) word list against the
//! literal word tokens of the rendered document. The output drives
//! progressive highlighting (token → timing) and click-to-seek
//! (alignment index → token index). Matching never fails globally: the
//! worst case is a fully interpolated result where audio plays and
//! highlighting degrades to approximate.

use serde::{Deserialize, Serialize};

use narrator_core::{AlignmentToDomMap, DocumentTiming, DomWordToken, GlobalWordBoundary, TokenTiming};

/// Matcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Forward search window for the first pass
    #[serde(default = "default_narrow_window")]
    pub narrow_window: usize,

    /// Fallback window for tokens the narrow pass missed (absorbs
    /// normalization insertions, e.g. a currency symbol expanded into
    /// several spoken words)
    #[serde(default = "default_wide_window")]
    pub wide_window: usize,
}

fn default_narrow_window() -> usize {
    5
}

fn default_wide_window() -> usize {
    15
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            narrow_window: default_narrow_window(),
            wide_window: default_wide_window(),
        }
    }
}

/// Match document tokens against the global alignment word list.
///
/// A monotonic pointer walks the alignment list; each DOM token searches a
/// bounded forward window, so one unmatched token never derails the rest.
/// Unmatched tokens receive timing interpolated between their nearest
/// matched neighbors, and the reverse map is made total by filling every
/// never-consumed alignment index with the nearest preceding matched DOM
/// index.
pub fn match_document(
    tokens: &[DomWordToken],
    boundaries: &[GlobalWordBoundary],
    config: &MatcherConfig,
) -> DocumentTiming {
    let norm_align: Vec<String> = boundaries.iter().map(|b| normalize(&b.text)).collect();

    let mut matches: Vec<Option<(u64, u64, usize)>> = Vec::with_capacity(tokens.len());
    let mut align_idx = 0usize;

    for token in tokens {
        let norm_token = normalize(&token.text);
        let found = if norm_token.is_empty() {
            None
        } else {
            search_window(&norm_align, &norm_token, align_idx, config.narrow_window)
                .or_else(|| search_window(&norm_align, &norm_token, align_idx, config.wide_window))
        };

        match found {
            Some(j) => {
                matches.push(Some((boundaries[j].start_ms, boundaries[j].end_ms, j)));
                align_idx = j + 1;
            }
            None => matches.push(None),
        }
    }

    let matched_count = matches.iter().filter(|m| m.is_some()).count();
    let matching_incomplete = matched_count < tokens.len();
    if matching_incomplete {
        tracing::warn!(
            tokens = tokens.len(),
            matched = matched_count,
            "some document tokens interpolated rather than matched"
        );
    }

    let token_timings = interpolate_unmatched(&matches, boundaries);
    let alignment_to_dom = build_reverse_map(&matches, boundaries.len());

    DocumentTiming {
        token_timings,
        alignment_to_dom,
        matched_count,
        matching_incomplete,
    }
}

/// Strip all non-alphanumeric characters and lowercase the rest.
fn normalize(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Exact match, or mutual containment for words of at least two
/// characters. The containment heuristic can false-positive on short
/// common substrings; that precision/recall tradeoff is intentional and
/// kept as documented behavior.
fn words_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    a.chars().count() >= 2 && b.chars().count() >= 2 && (a.contains(b) || b.contains(a))
}

fn search_window(norm_align: &[String], norm_token: &str, from: usize, window: usize) -> Option<usize> {
    let to = (from + window).min(norm_align.len());
    (from..to).find(|&j| words_match(norm_token, &norm_align[j]))
}

/// Assign timing to every token: matched tokens keep their alignment
/// word's timing; runs of unmatched tokens get time distributed linearly
/// between the nearest matched neighbors. A synthetic boundary's end
/// trails its start by 80% of the per-token step so highlights are never
/// zero-length.
fn interpolate_unmatched(
    matches: &[Option<(u64, u64, usize)>],
    boundaries: &[GlobalWordBoundary],
) -> Vec<TokenTiming> {
    let stream_end = boundaries.last().map(|b| b.end_ms).unwrap_or(0);
    let mut timings = Vec::with_capacity(matches.len());
    let mut prev_end = 0u64;
    let mut i = 0;

    while i < matches.len() {
        if let Some((start_ms, end_ms, alignment_index)) = matches[i] {
            timings.push(TokenTiming::Matched {
                start_ms,
                end_ms,
                alignment_index,
            });
            prev_end = end_ms;
            i += 1;
            continue;
        }

        let run_start = i;
        while i < matches.len() && matches[i].is_none() {
            i += 1;
        }
        let run_len = i - run_start;

        let next_start = match matches.get(i) {
            Some(&Some((start_ms, _, _))) => start_ms,
            _ => stream_end.max(prev_end),
        };
        let step = next_start.saturating_sub(prev_end) as f64 / run_len as f64;

        for k in 0..run_len {
            let start = prev_end as f64 + step * k as f64;
            let end = start + step * 0.8;
            timings.push(TokenTiming::Interpolated {
                start_ms: start.round() as u64,
                end_ms: end.round() as u64,
            });
        }
    }

    timings
}

/// Total reverse map. Alignment indices consumed by a match point at
/// their DOM index; every other index inherits the nearest preceding
/// matched DOM index (0 before the first match), which keeps the map
/// non-decreasing.
fn build_reverse_map(matches: &[Option<(u64, u64, usize)>], alignment_len: usize) -> AlignmentToDomMap {
    let mut direct: Vec<Option<usize>> = vec![None; alignment_len];
    for (dom_idx, m) in matches.iter().enumerate() {
        if let Some((_, _, alignment_index)) = m {
            direct[*alignment_index] = Some(dom_idx);
        }
    }

    let mut filled = Vec::with_capacity(alignment_len);
    let mut last_dom = 0usize;
    for entry in direct {
        if let Some(dom_idx) = entry {
            last_dom = dom_idx;
        }
        filled.push(last_dom);
    }

    AlignmentToDomMap::new(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<DomWordToken> {
        words
            .iter()
            .enumerate()
            .map(|(i, w)| DomWordToken::new(*w, format!("node-{i}")))
            .collect()
    }

    fn boundaries(words: &[&str]) -> Vec<GlobalWordBoundary> {
        words
            .iter()
            .enumerate()
            .map(|(i, w)| GlobalWordBoundary {
                text: w.to_string(),
                start_ms: i as u64 * 100,
                end_ms: i as u64 * 100 + 80,
                abs_char_offset: 0,
                char_len: w.chars().count(),
                segment_index: 0,
            })
            .collect()
    }

    #[test]
    fn test_identical_lists_yield_identity_map() {
        let words = ["The", "quick", "brown", "fox"];
        let timing = match_document(&tokens(&words), &boundaries(&words), &MatcherConfig::default());

        assert!(timing.alignment_to_dom.is_identity());
        assert_eq!(timing.matched_count, 4);
        assert!(!timing.matching_incomplete);
        for (i, t) in timing.token_timings.iter().enumerate() {
            assert_eq!(
                *t,
                TokenTiming::Matched {
                    start_ms: i as u64 * 100,
                    end_ms: i as u64 * 100 + 80,
                    alignment_index: i,
                }
            );
        }
    }

    #[test]
    fn test_normalization_ignores_punctuation_and_case() {
        let timing = match_document(
            &tokens(&["Hello,", "World!"]),
            &boundaries(&["hello", "world"]),
            &MatcherConfig::default(),
        );
        assert_eq!(timing.matched_count, 2);
    }

    #[test]
    fn test_extra_alignment_word_skipped() {
        // Normalization inserted one spoken word with no DOM counterpart
        let timing = match_document(
            &tokens(&["a1", "b2", "c3"]),
            &boundaries(&["a1", "extra", "b2", "c3"]),
            &MatcherConfig::default(),
        );

        assert_eq!(timing.matched_count, 3);
        assert!(!timing.matching_incomplete);
        // The skipped alignment index inherits its preceding DOM index
        assert_eq!(timing.alignment_to_dom.as_slice(), &[0, 0, 1, 2]);
    }

    #[test]
    fn test_wide_window_absorbs_long_insertion() {
        // Seven inserted words: past the narrow window, within the wide one
        let align = ["start", "w1", "w2", "w3", "w4", "w5", "w6", "w7", "finish"];
        let timing = match_document(
            &tokens(&["start", "finish"]),
            &boundaries(&align),
            &MatcherConfig::default(),
        );

        assert_eq!(timing.matched_count, 2);
        assert_eq!(
            timing.token_timings[1],
            TokenTiming::Matched {
                start_ms: 800,
                end_ms: 880,
                alignment_index: 8,
            }
        );
    }

    #[test]
    fn test_containment_match() {
        let timing = match_document(
            &tokens(&["cost"]),
            &boundaries(&["costs"]),
            &MatcherConfig::default(),
        );
        assert_eq!(timing.matched_count, 1);
    }

    #[test]
    fn test_interpolated_run_between_matches() {
        // "??" normalizes to empty and can never match
        let timing = match_document(
            &tokens(&["one", "??", "two"]),
            &boundaries(&["one", "two"]),
            &MatcherConfig::default(),
        );

        assert_eq!(timing.matched_count, 2);
        assert!(timing.matching_incomplete);
        // Matched neighbors: end 80, next start 100; one-token run,
        // step 20, end trails start by 80% of the step
        assert_eq!(
            timing.token_timings[1],
            TokenTiming::Interpolated {
                start_ms: 80,
                end_ms: 96,
            }
        );
    }

    #[test]
    fn test_all_unmatched_interpolates_whole_document() {
        let timing = match_document(
            &tokens(&["xx9", "yy8", "zz7"]),
            &boundaries(&["aaa", "bbb"]),
            &MatcherConfig::default(),
        );

        assert_eq!(timing.matched_count, 0);
        assert!(timing.matching_incomplete);
        assert_eq!(timing.token_timings.len(), 3);

        let mut prev = 0u64;
        for t in &timing.token_timings {
            assert!(!t.is_matched());
            assert!(t.start_ms() >= prev);
            assert!(t.end_ms() >= t.start_ms());
            prev = t.start_ms();
        }
        // Distributed over the stream: last boundary ends at 180
        assert!(timing.token_timings[2].end_ms() <= 180);
    }

    #[test]
    fn test_reverse_map_total_and_monotonic() {
        let timing = match_document(
            &tokens(&["b2", "d4"]),
            &boundaries(&["a1", "b2", "c3", "d4", "e5"]),
            &MatcherConfig::default(),
        );

        let map = timing.alignment_to_dom.as_slice();
        assert_eq!(map.len(), 5);
        // Leading unconsumed index falls back to 0; later ones inherit
        // the preceding match
        assert_eq!(map, &[0, 0, 0, 1, 1]);
        for pair in map.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_empty_inputs() {
        let timing = match_document(&[], &boundaries(&["a"]), &MatcherConfig::default());
        assert!(timing.token_timings.is_empty());
        assert_eq!(timing.alignment_to_dom.len(), 1);

        let timing = match_document(&tokens(&["a"]), &[], &MatcherConfig::default());
        assert_eq!(timing.token_timings.len(), 1);
        assert!(timing.alignment_to_dom.is_empty());
    }
}
