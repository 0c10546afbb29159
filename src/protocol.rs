//! HTTP request/response DTOs.
//!
//! Every response is wrapped as `{ success, data }` or `{ success: false, error: { code, message } }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::domain::{
  AnswerKeyEntry, GradingDetail, GradingReport, GradingSummary, Question, QuestionType, TypeStats,
};

#[derive(Serialize, Debug)]
pub struct HealthOut {
  pub ok: bool,
  pub provider: &'static str,
}

#[derive(Serialize, Debug)]
pub struct Envelope<T: Serialize> {
  pub success: bool,
  pub data: T,
}

impl<T: Serialize> Envelope<T> {
  pub fn ok(data: T) -> Self {
    Self { success: true, data }
  }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
  pub code: &'static str,
  pub message: String,
}

#[derive(Serialize, Debug)]
pub struct ErrorOut {
  pub success: bool,
  pub error: ErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct SegmentIn {
  pub text: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SegmentOut {
  pub total_questions: usize,
  pub total_points: f64,
  pub questions: Vec<Question>,
}

impl SegmentOut {
  pub fn new(questions: Vec<Question>) -> Self {
    Self { total_questions: questions.len(), total_points: questions.iter().map(|q| q.points).sum(), questions }
  }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeIn {
  pub image_paths: Vec<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeOut {
  pub confidence: f64,
  #[serde(flatten)]
  pub segments: SegmentOut,
}

/// Per-request threshold overrides; unset fields keep the configured value.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GradingOptions {
  #[serde(default)]
  pub fuzzy_threshold: Option<f64>,
  #[serde(default)]
  pub short_answer_threshold: Option<f64>,
}

impl GradingOptions {
  pub fn is_empty(&self) -> bool {
    self.fuzzy_threshold.is_none() && self.short_answer_threshold.is_none()
  }

  pub fn apply(&self, base: Thresholds) -> Thresholds {
    Thresholds {
      fuzzy_threshold: self.fuzzy_threshold.unwrap_or(base.fuzzy_threshold),
      short_answer_threshold: self.short_answer_threshold.unwrap_or(base.short_answer_threshold),
    }
  }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GradeIn {
  pub questions: Vec<Question>,
  pub answer_key: Vec<AnswerKeyEntry>,
  #[serde(default)]
  pub grading_options: GradingOptions,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GradeOut {
  pub grading_result_id: String,
  pub summary: GradingSummary,
  pub type_stats: BTreeMap<QuestionType, TypeStats>,
  pub details: Vec<GradingDetail>,
  pub grading_time_ms: u128,
}

impl GradeOut {
  pub fn new(id: String, report: GradingReport, grading_time_ms: u128) -> Self {
    Self {
      grading_result_id: id,
      summary: report.summary,
      type_stats: report.type_stats,
      details: report.details,
      grading_time_ms,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn grade_request_parses_camel_case() {
    let body = r#"{
      "questions": [{"number": 1, "type": "multiple_choice", "recognizedText": "③", "points": 3}],
      "answerKey": [{"questionNumber": 1, "type": "multiple_choice", "correctAnswer": "3", "points": 3}],
      "gradingOptions": {"fuzzyThreshold": 0.6}
    }"#;
    let g: GradeIn = serde_json::from_str(body).unwrap();
    assert_eq!(g.questions[0].recognized_text, "③");
    assert_eq!(g.questions[0].confidence, 1.0);
    assert_eq!(g.answer_key[0].correct_answer, "3");
    assert_eq!(g.grading_options.fuzzy_threshold, Some(0.6));
  }

  #[test]
  fn options_merge_over_base() {
    let opts = GradingOptions { fuzzy_threshold: None, short_answer_threshold: Some(0.95) };
    let t = opts.apply(Thresholds::default());
    assert_eq!(t.fuzzy_threshold, 0.7);
    assert_eq!(t.short_answer_threshold, 0.95);
    assert!(GradingOptions::default().is_empty());
  }
}
