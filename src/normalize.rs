//! Canonical forms of answers used before comparison.

/// Punctuation removed by [`normalize_text`].
const STRIPPED_PUNCT: &[char] = &['.', ',', '!', '?', ';', ':', '\'', '"'];

/// Map a circled-digit glyph (`①`..`⑤`) to its digit.
pub fn circled_digit(ch: char) -> Option<char> {
  match ch {
    '①' => Some('1'),
    '②' => Some('2'),
    '③' => Some('3'),
    '④' => Some('4'),
    '⑤' => Some('5'),
    _ => None,
  }
}

/// Reduce a multiple-choice mark to a single choice token.
///
/// `③`, `c`, `C` and `3` all become `"3"`. Anything else falls back to the
/// first ASCII digit it contains, and failing that to the trimmed input.
pub fn normalize_multiple_choice(answer: &str) -> String {
  let s = answer.trim();
  if s.is_empty() {
    return String::new();
  }

  let mut chars = s.chars();
  if let (Some(only), None) = (chars.next(), chars.next()) {
    if let Some(d) = circled_digit(only) {
      return d.to_string();
    }
    let letter = match only.to_ascii_lowercase() {
      'a' => Some('1'),
      'b' => Some('2'),
      'c' => Some('3'),
      'd' => Some('4'),
      'e' => Some('5'),
      _ => None,
    };
    if let Some(d) = letter {
      return d.to_string();
    }
  }

  match s.chars().find(|c| c.is_ascii_digit()) {
    Some(d) => d.to_string(),
    None => s.to_string(),
  }
}

/// Lower-case, trim, and drop `. , ! ? ; : ' "`.
pub fn normalize_text(answer: &str) -> String {
  answer
    .trim()
    .to_lowercase()
    .chars()
    .filter(|c| !STRIPPED_PUNCT.contains(c))
    .collect()
}
