//! Domain models shared by segmentation and grading: questions, answer key
//! entries, and the graded output records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Shape of a question, decided by segmentation and used to pick a grading strategy.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  /// A single choice mark such as `③`, `c` or `3`.
  MultipleChoice,
  /// A word or short phrase compared by fuzzy match.
  ShortAnswer,
  /// Free text scored by the essay provider (or the weighted heuristic).
  Essay,
}

impl QuestionType {
  pub fn as_str(self) -> &'static str {
    match self {
      QuestionType::MultipleChoice => "multiple_choice",
      QuestionType::ShortAnswer => "short_answer",
      QuestionType::Essay => "essay",
    }
  }
}

impl std::fmt::Display for QuestionType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One segmented question. Created by the segmenter and never mutated by grading.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub number: u32,
  #[serde(rename = "type")]
  pub question_type: QuestionType,
  #[serde(default)]
  pub prompt: String,
  #[serde(default)]
  pub recognized_text: String,
  #[serde(default = "default_confidence")]
  pub confidence: f64,
  pub points: f64,
  /// Set when the numbering line did not increase over the previous boundary.
  #[serde(default)]
  pub ambiguous: bool,
}

fn default_confidence() -> f64 { 1.0 }

/// Instructor-supplied expected answer for one question.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKeyEntry {
  pub question_number: u32,
  #[serde(rename = "type", default)]
  pub question_type: Option<QuestionType>,
  pub correct_answer: String,
  /// Overrides `Question::points` when present.
  #[serde(default)]
  pub points: Option<f64>,
  #[serde(default)]
  pub keywords: Option<Vec<String>>,
  /// Advisory only; passed to the essay provider verbatim.
  #[serde(default)]
  pub rubric: Option<String>,
}

/// Which path produced a detail's score.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GradedBy {
  /// Deterministic multiple-choice / short-answer rules, or the no-answer short circuit.
  Rule,
  /// Weighted essay heuristic, used as the configured essay grader.
  Heuristic,
  /// The configured remote essay provider.
  Provider,
  /// Weighted essay heuristic substituted after a provider failure or timeout.
  Fallback,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KeywordMatch {
  pub matched: Vec<String>,
  pub missed: Vec<String>,
  pub match_rate: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GradingDetail {
  pub question_number: u32,
  #[serde(rename = "type")]
  pub question_type: QuestionType,
  pub student_answer: String,
  pub correct_answer: String,
  pub is_correct: bool,
  pub earned_points: f64,
  pub max_points: f64,
  pub similarity: f64,
  pub feedback: String,
  pub graded_by: GradedBy,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub keyword_match: Option<KeywordMatch>,
}

impl GradingDetail {
  /// Earned something but not judged fully correct.
  pub fn is_partial(&self) -> bool {
    !self.is_correct && self.earned_points > 0.0
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GradingSummary {
  pub total_score: f64,
  pub total_points: f64,
  pub percentage: f64,
  pub correct_count: usize,
  pub wrong_count: usize,
  pub partial_count: usize,
  pub total_questions: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TypeStats {
  pub total: usize,
  pub correct: usize,
  pub points: f64,
  pub max_points: f64,
}

/// Output of one grading run. Pure function of its inputs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GradingReport {
  pub summary: GradingSummary,
  pub details: Vec<GradingDetail>,
  pub type_stats: BTreeMap<QuestionType, TypeStats>,
}

/// Round to one decimal place, half away from zero.
pub fn round1(x: f64) -> f64 {
  (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn question_type_serializes_snake_case() {
    let s = serde_json::to_string(&QuestionType::MultipleChoice).unwrap();
    assert_eq!(s, "\"multiple_choice\"");
    let t: QuestionType = serde_json::from_str("\"essay\"").unwrap();
    assert_eq!(t, QuestionType::Essay);
  }

  #[test]
  fn answer_key_entry_accepts_minimal_camel_case() {
    let json = r#"{"questionNumber": 2, "correctAnswer": "goes"}"#;
    let entry: AnswerKeyEntry = serde_json::from_str(json).unwrap();
    assert_eq!(entry.question_number, 2);
    assert_eq!(entry.correct_answer, "goes");
    assert!(entry.points.is_none());
    assert!(entry.question_type.is_none());
  }

  #[test]
  fn type_stats_map_uses_type_names_as_keys() {
    let mut report = GradingReport::default();
    report.type_stats.insert(QuestionType::ShortAnswer, TypeStats { total: 1, ..Default::default() });
    let v = serde_json::to_value(&report).unwrap();
    assert_eq!(v["typeStats"]["short_answer"]["total"], 1);
  }

  #[test]
  fn round1_matches_half_up_for_positive_values() {
    assert_eq!(round1(3.75), 3.8);
    assert_eq!(round1(0.04), 0.0);
    assert_eq!(round1(10.0), 10.0);
  }
}
