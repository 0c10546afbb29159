//! Edit-distance similarity between two answers.
//!
//! Lengths and edits are counted in `char`s so that Hangul or circled digits
//! count as one symbol each.

/// Classic Levenshtein distance with unit insert/delete/substitute cost.
///
/// Two-row dynamic programming over the full strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  if a.is_empty() {
    return b.len();
  }
  if b.is_empty() {
    return a.len();
  }

  let mut prev: Vec<usize> = (0..=b.len()).collect();
  let mut cur = vec![0usize; b.len() + 1];

  for (i, ca) in a.iter().enumerate() {
    cur[0] = i + 1;
    for (j, cb) in b.iter().enumerate() {
      let cost = usize::from(ca != cb);
      cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
    }
    std::mem::swap(&mut prev, &mut cur);
  }
  prev[b.len()]
}

/// `1 - distance / max(len)` on lower-cased inputs, in `[0, 1]`.
///
/// Both empty is a perfect match; exactly one empty is no match at all.
pub fn similarity(a: &str, b: &str) -> f64 {
  match (a.is_empty(), b.is_empty()) {
    (true, true) => return 1.0,
    (true, false) | (false, true) => return 0.0,
    _ => {}
  }
  let a = a.to_lowercase();
  let b = b.to_lowercase();
  let longest = a.chars().count().max(b.chars().count());
  let distance = levenshtein_distance(&a, &b);
  (1.0 - distance as f64 / longest as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_distances() {
    assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    assert_eq!(levenshtein_distance("goas", "goes"), 1);
    assert_eq!(levenshtein_distance("", "abc"), 3);
    assert_eq!(levenshtein_distance("abc", ""), 3);
    assert_eq!(levenshtein_distance("flaw", "lawn"), 2);
  }

  #[test]
  fn distance_is_symmetric() {
    let samples = ["", "a", "goes", "goas", "beautiful", "나는 학생입니다", "③", "I am a student"];
    for a in samples {
      for b in samples {
        assert_eq!(levenshtein_distance(a, b), levenshtein_distance(b, a), "{a:?} vs {b:?}");
      }
    }
  }

  #[test]
  fn identical_strings_are_fully_similar() {
    for s in ["", "x", "went", "I study hard because I want to get good grades.", "학생"] {
      assert_eq!(similarity(s, s), 1.0);
    }
  }

  #[test]
  fn one_empty_side_is_zero() {
    assert_eq!(similarity("goes", ""), 0.0);
    assert_eq!(similarity("", "goes"), 0.0);
    assert_eq!(similarity("", ""), 1.0);
  }

  #[test]
  fn similarity_ignores_case() {
    assert_eq!(similarity("Taller", "taller"), 1.0);
    assert!((similarity("goas", "goes") - 0.75).abs() < 1e-12);
  }

  #[test]
  fn multibyte_counts_chars() {
    // one substituted syllable out of three
    let s = similarity("학생이", "학생은");
    assert!((s - (1.0 - 1.0 / 3.0)).abs() < 1e-12);
  }
}
