//! Per-type grading strategies and the essay grading capability.
//!
//! Multiple-choice and short-answer grading are pure functions. Essays go
//! through an [`EssayGrader`]: the weighted [`HeuristicEssayGrader`] is the
//! reference implementation, and remote adapters (see `openai`) implement the
//! same trait.

use async_trait::async_trait;

use crate::config::{EssayConfig, Thresholds};
use crate::domain::{round1, KeywordMatch};
use crate::error::ProviderError;
use crate::grammar::grammar_score;
use crate::keywords::{extract_keywords, match_keywords};
use crate::normalize::{normalize_multiple_choice, normalize_text};
use crate::similarity::similarity;

pub const NO_ANSWER_FEEDBACK: &str = "No answer was written.";
const CORRECT_FEEDBACK: &str = "Correct!";

/// Result of grading one question, before it is placed in a detail record.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
  pub is_correct: bool,
  pub earned_points: f64,
  pub similarity: f64,
  pub feedback: String,
}

impl Outcome {
  pub fn no_answer() -> Self {
    Self { is_correct: false, earned_points: 0.0, similarity: 0.0, feedback: NO_ANSWER_FEEDBACK.into() }
  }
}

pub fn grade_multiple_choice(student: &str, correct: &str, max_points: f64) -> Outcome {
  let is_correct = normalize_multiple_choice(student) == normalize_multiple_choice(correct);
  if is_correct {
    Outcome { is_correct, earned_points: max_points, similarity: 1.0, feedback: CORRECT_FEEDBACK.into() }
  } else {
    Outcome {
      is_correct,
      earned_points: 0.0,
      similarity: 0.0,
      feedback: format!("Incorrect. The correct answer is {}.", correct.trim()),
    }
  }
}

/// Fuzzy match: exact (after normalization) or above the full-credit
/// threshold earns everything, above the fuzzy threshold earns a share.
pub fn grade_short_answer(student: &str, correct: &str, max_points: f64, t: &Thresholds) -> Outcome {
  if student.trim().is_empty() {
    return Outcome::no_answer();
  }

  let student_norm = normalize_text(student);
  let correct_norm = normalize_text(correct);
  if student_norm == correct_norm {
    return Outcome { is_correct: true, earned_points: max_points, similarity: 1.0, feedback: CORRECT_FEEDBACK.into() };
  }

  let sim = similarity(&student_norm, &correct_norm);
  let percent = (sim * 100.0).round();
  // The higher threshold always gates full credit.
  let full = t.short_answer_threshold.max(t.fuzzy_threshold);
  let partial = t.short_answer_threshold.min(t.fuzzy_threshold);

  if sim >= full {
    Outcome {
      is_correct: true,
      earned_points: max_points,
      similarity: sim,
      feedback: format!("Accepted as correct (similarity {percent}%)."),
    }
  } else if sim >= partial {
    Outcome {
      is_correct: false,
      earned_points: round1(max_points * sim).clamp(0.0, max_points),
      similarity: sim,
      feedback: format!("Partial credit (similarity {percent}%). Correct answer: {}", correct.trim()),
    }
  } else {
    Outcome {
      is_correct: false,
      earned_points: 0.0,
      similarity: sim,
      feedback: format!("Incorrect. Correct answer: {}", correct.trim()),
    }
  }
}

/// Input to an essay grader.
#[derive(Clone, Debug, PartialEq)]
pub struct EssayRequest {
  pub student_answer: String,
  pub correct_answer: String,
  pub max_points: f64,
  pub keywords: Vec<String>,
  pub rubric: Option<String>,
}

/// What every essay grader returns. `score` is in points, `percentage` in `[0, 100]`.
#[derive(Clone, Debug, PartialEq)]
pub struct EssayAssessment {
  pub score: f64,
  pub percentage: f64,
  pub similarity: f64,
  pub feedback: String,
  pub keyword_match: Option<KeywordMatch>,
}

impl EssayAssessment {
  /// Force provider output into range for the given maximum.
  pub fn clamped(mut self, max_points: f64) -> Self {
    self.score = if self.score.is_finite() { self.score.clamp(0.0, max_points) } else { 0.0 };
    self.percentage = if self.percentage.is_finite() { self.percentage.clamp(0.0, 100.0) } else { 0.0 };
    self.similarity = if self.similarity.is_finite() { self.similarity.clamp(0.0, 1.0) } else { 0.0 };
    self
  }
}

/// Essay grading capability. One shot per call; retries belong to the implementor.
#[async_trait]
pub trait EssayGrader: Send + Sync {
  fn name(&self) -> &'static str;

  async fn grade_essay(&self, req: &EssayRequest) -> Result<EssayAssessment, ProviderError>;
}

/// Weighted combination of text similarity, keyword coverage and the grammar check.
#[derive(Clone, Debug, Default)]
pub struct HeuristicEssayGrader {
  config: EssayConfig,
}

impl HeuristicEssayGrader {
  pub fn new(config: EssayConfig) -> Self {
    Self { config }
  }

  pub fn weighted_score(&self, text_similarity: f64, keyword_rate: f64, grammar: f64) -> f64 {
    let c = &self.config;
    (c.similarity_weight * text_similarity + c.keyword_weight * keyword_rate + c.grammar_weight * grammar)
      .clamp(0.0, 1.0)
  }

  /// Infallible synchronous form of [`EssayGrader::grade_essay`].
  pub fn assess(&self, req: &EssayRequest) -> EssayAssessment {
    let keywords = if req.keywords.is_empty() {
      extract_keywords(&req.correct_answer, self.config.max_keywords)
    } else {
      req.keywords.clone()
    };

    let student = req.student_answer.trim().to_lowercase();
    let correct = req.correct_answer.trim().to_lowercase();
    let text_similarity = similarity(&student, &correct);
    let keyword_match = match_keywords(&req.student_answer, &keywords);
    let grammar = grammar_score(&req.student_answer);

    let weighted = self.weighted_score(text_similarity, keyword_match.match_rate, grammar);
    let score = round1(weighted * req.max_points).clamp(0.0, req.max_points.max(0.0));
    let feedback = essay_feedback(text_similarity, &keyword_match, grammar, &req.student_answer, &req.correct_answer);

    EssayAssessment {
      score,
      percentage: weighted * 100.0,
      similarity: (text_similarity * 100.0).round() / 100.0,
      feedback,
      keyword_match: Some(keyword_match),
    }
  }
}

#[async_trait]
impl EssayGrader for HeuristicEssayGrader {
  fn name(&self) -> &'static str {
    "heuristic"
  }

  async fn grade_essay(&self, req: &EssayRequest) -> Result<EssayAssessment, ProviderError> {
    Ok(self.assess(req))
  }
}

fn essay_feedback(
  text_similarity: f64,
  keywords: &KeywordMatch,
  grammar: f64,
  student: &str,
  correct: &str,
) -> String {
  if student.trim().is_empty() {
    return NO_ANSWER_FEEDBACK.into();
  }

  let mut parts: Vec<String> = Vec::new();
  parts.push(
    match text_similarity {
      s if s >= 0.9 => "Very similar to the model answer. Well done!",
      s if s >= 0.7 => "Mostly correct, but some parts need revision.",
      s if s >= 0.5 => "Partially correct.",
      _ => "Very different from the model answer. Please review it.",
    }
    .to_string(),
  );
  if !keywords.missed.is_empty() {
    parts.push(format!("Missed key terms: {}.", keywords.missed.join(", ")));
  }
  if grammar < 0.8 && student.chars().count() > 10 {
    parts.push("Check grammar and formatting.".into());
  }
  parts.push(format!("Model answer: {correct}"));
  parts.join(" ")
}
