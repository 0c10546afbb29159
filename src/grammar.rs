//! Cheap structural quality check for free-text answers.

const NOT_CAPITALIZED: f64 = 0.1;
const NO_TERMINAL_PUNCT: f64 = 0.1;
const DOUBLE_WHITESPACE: f64 = 0.05;

/// Score in `[0, 1]`; whitespace-only answers score `0.0`.
pub fn grammar_score(answer: &str) -> f64 {
  let trimmed = answer.trim();
  let Some(first) = trimmed.chars().next() else {
    return 0.0;
  };

  let mut score = 1.0;

  // Uncased scripts (Hangul, digits) have no upper case and are not penalized.
  if first.to_uppercase().next() != Some(first) {
    score -= NOT_CAPITALIZED;
  }

  if trimmed.chars().count() > 10 && !trimmed.ends_with(['.', '!', '?']) {
    score -= NO_TERMINAL_PUNCT;
  }

  let mut prev_ws = false;
  for c in trimmed.chars() {
    let ws = c.is_whitespace();
    if ws && prev_ws {
      score -= DOUBLE_WHITESPACE;
      break;
    }
    prev_ws = ws;
  }

  f64::clamp(score, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
  }

  #[test]
  fn clean_sentence_scores_full() {
    assert!(approx(grammar_score("I study hard because I want to get good grades."), 1.0));
    assert!(approx(grammar_score("Went"), 1.0));
  }

  #[test]
  fn empty_is_zero() {
    assert_eq!(grammar_score(""), 0.0);
    assert_eq!(grammar_score("   \n\t"), 0.0);
  }

  #[test]
  fn penalties_stack() {
    assert!(approx(grammar_score("went"), 0.9));
    assert!(approx(grammar_score("I study hard every day"), 0.9));
    assert!(approx(grammar_score("i study  hard every day"), 0.75));
  }

  #[test]
  fn short_answers_skip_terminal_check() {
    assert!(approx(grammar_score("Taller"), 1.0));
  }
}
