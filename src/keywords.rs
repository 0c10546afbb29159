//! Keyword presence checks and keyword extraction for essay grading.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::domain::KeywordMatch;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  [
    "the", "a", "an", "is", "are", "was", "were", "to", "of", "in", "for", "and", "or", "but", "i",
    "my", "me",
  ]
  .into_iter()
  .collect()
});

/// Case-insensitive substring test of every keyword against the raw answer.
///
/// An empty keyword list is vacuously satisfied (`match_rate == 1.0`).
pub fn match_keywords(answer: &str, keywords: &[String]) -> KeywordMatch {
  if keywords.is_empty() {
    return KeywordMatch { matched: vec![], missed: vec![], match_rate: 1.0 };
  }

  let haystack = answer.to_lowercase();
  let (matched, missed): (Vec<String>, Vec<String>) =
    keywords.iter().cloned().partition(|k| haystack.contains(&k.to_lowercase()));

  let match_rate = matched.len() as f64 / keywords.len() as f64;
  KeywordMatch { matched, missed, match_rate }
}

fn is_hangul(ch: char) -> bool {
  ('\u{AC00}'..='\u{D7A3}').contains(&ch)
}

/// Derive up to `limit` keywords from a model answer.
///
/// Keeps lower-case Latin letters, Hangul syllables, and whitespace; drops
/// stop-words and tokens of two characters or fewer.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
  let cleaned: String = text
    .to_lowercase()
    .chars()
    .filter(|&c| c.is_ascii_lowercase() || is_hangul(c) || c.is_whitespace())
    .collect();

  cleaned
    .split_whitespace()
    .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
    .take(limit)
    .map(str::to_string)
    .collect()
}
