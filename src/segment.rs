//! Question segmentation and classification of recognized exam text.
//!
//! An unindented line matching `^(\d+)[.)]\s*(.*)` opens a new question.
//! Following non-blank lines are space-joined into that question's answer.
//! The text after the number is the question prompt. Only when no answer
//! lines follow and that text is a single choice mark (`1) ③`) is it taken as
//! the answer; otherwise a question with no answer lines has an empty answer.
//!
//! Numbering is never re-derived: a boundary whose number does not increase
//! over the previous one is still a boundary, flagged `ambiguous` with its
//! confidence halved.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use crate::config::DefaultPoints;
use crate::domain::{Question, QuestionType};
use crate::normalize::circled_digit;

static NUMBER_LINE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(\d+)[.)]\s*(.*)").expect("question number pattern"));

const MULTIPLE_CHOICE_CONFIDENCE: f64 = 0.95;
const ESSAY_CONFIDENCE: f64 = 0.85;
const SHORT_ANSWER_CONFIDENCE: f64 = 0.88;
/// Answers longer than this many characters are essays.
const ESSAY_MIN_CHARS: usize = 20;
const AMBIGUOUS_PENALTY: f64 = 0.5;

/// Infer the question type from the answer's shape. Total: never fails.
pub fn classify(answer: &str) -> (QuestionType, f64) {
  let t = answer.trim();
  let mut chars = t.chars();
  if let (Some(c), None) = (chars.next(), chars.next()) {
    if circled_digit(c).is_some() || ('1'..='5').contains(&c) {
      return (QuestionType::MultipleChoice, MULTIPLE_CHOICE_CONFIDENCE);
    }
  }
  if t.chars().count() > ESSAY_MIN_CHARS {
    (QuestionType::Essay, ESSAY_CONFIDENCE)
  } else {
    (QuestionType::ShortAnswer, SHORT_ANSWER_CONFIDENCE)
  }
}

fn is_choice_mark(text: &str) -> bool {
  !text.trim().is_empty() && classify(text).0 == QuestionType::MultipleChoice
}

/// Splits recognized text into typed questions. Holds only its injected config.
#[derive(Clone, Debug, Default)]
pub struct Segmenter {
  points: DefaultPoints,
}

struct Pending {
  number: u32,
  head: String,
  lines: Vec<String>,
  ambiguous: bool,
}

impl Segmenter {
  pub fn new(points: DefaultPoints) -> Self {
    Self { points }
  }

  /// Segment the full text of one exam (all pages already concatenated).
  #[instrument(level = "debug", skip(self, raw), fields(text_len = raw.len()))]
  pub fn segment(&self, raw: &str) -> Vec<Question> {
    let mut out = Vec::new();
    let mut current: Option<Pending> = None;
    let mut last_number: Option<u32> = None;

    for line in raw.lines() {
      let trimmed = line.trim();
      if trimmed.is_empty() {
        continue;
      }

      // Indented numbered lines belong to the answer body.
      let boundary = NUMBER_LINE
        .captures(line)
        .and_then(|caps| Some((caps[1].parse::<u32>().ok()?, caps[2].trim().to_string())));

      match boundary {
        Some((number, head)) => {
          if let Some(p) = current.take() {
            out.push(self.finish(p));
          }
          let ambiguous = last_number.is_some_and(|last| number <= last);
          if ambiguous {
            debug!(target: "grading", number, previous = ?last_number, "Non-increasing question number; keeping boundary");
          }
          last_number = Some(number);
          current = Some(Pending { number, head, lines: Vec::new(), ambiguous });
        }
        None => {
          if let Some(p) = current.as_mut() {
            p.lines.push(trimmed.to_string());
          }
        }
      }
    }

    if let Some(p) = current.take() {
      out.push(self.finish(p));
    }
    debug!(target: "grading", questions = out.len(), "Segmentation finished");
    out
  }

  fn finish(&self, p: Pending) -> Question {
    let (prompt, answer) = if !p.lines.is_empty() {
      (p.head, p.lines.join(" "))
    } else if is_choice_mark(&p.head) {
      (String::new(), p.head)
    } else {
      (p.head, String::new())
    };
    let (question_type, mut confidence) = classify(&answer);
    if p.ambiguous {
      confidence *= AMBIGUOUS_PENALTY;
    }
    Question {
      number: p.number,
      question_type,
      prompt,
      recognized_text: answer,
      confidence,
      points: self.points.for_type(question_type),
      ambiguous: p.ambiguous,
    }
  }
}
