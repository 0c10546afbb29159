//! Grading orchestrator.
//!
//! Validates the batch, pairs each question with its answer key entry, runs the
//! strategy for the question's type, and aggregates the summary and per-type
//! statistics. A question with no key entry is skipped. Essay provider
//! failures and timeouts are absorbed per question by the weighted heuristic.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::{GraderConfig, Thresholds};
use crate::domain::{
  round1, AnswerKeyEntry, GradedBy, GradingDetail, GradingReport, GradingSummary, KeywordMatch, Question,
  QuestionType, TypeStats,
};
use crate::error::{ConfigError, GradingError, ProviderError};
use crate::keywords::extract_keywords;
use crate::strategy::{
  grade_multiple_choice, grade_short_answer, EssayAssessment, EssayGrader, EssayRequest, HeuristicEssayGrader,
  Outcome,
};

#[derive(Clone)]
pub struct Grader {
  config: GraderConfig,
  reference: HeuristicEssayGrader,
  provider: Option<Arc<dyn EssayGrader>>,
}

impl std::fmt::Debug for Grader {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Grader")
      .field("config", &self.config)
      .field("provider", &self.provider_name())
      .finish()
  }
}

impl Grader {
  /// Build a grader that scores essays with the weighted heuristic only.
  pub fn new(config: GraderConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    let reference = HeuristicEssayGrader::new(config.essay.clone());
    Ok(Self { config, reference, provider: None })
  }

  /// Route essays through `provider`, keeping the heuristic as fallback.
  pub fn with_provider(mut self, provider: Arc<dyn EssayGrader>) -> Self {
    self.provider = Some(provider);
    self
  }

  /// Copy of this grader with different short-answer thresholds.
  /// Invalid thresholds are rejected as [`GradingError::Config`].
  pub fn with_thresholds(&self, thresholds: Thresholds) -> Result<Self, GradingError> {
    thresholds.validate()?;
    let mut g = self.clone();
    g.config.grading = thresholds;
    Ok(g)
  }

  pub fn config(&self) -> &GraderConfig {
    &self.config
  }

  pub fn provider_name(&self) -> &'static str {
    self.provider.as_ref().map_or(self.reference.name(), |p| p.name())
  }

  /// Grade one exam. Fails only on batch validation; never partially.
  #[instrument(level = "info", skip_all, fields(questions = questions.len(), key_entries = answer_key.len(), provider = self.provider_name()))]
  pub async fn grade(&self, questions: &[Question], answer_key: &[AnswerKeyEntry]) -> Result<GradingReport, GradingError> {
    let key = validate(questions, answer_key)?;

    let mut details = Vec::with_capacity(questions.len());
    for q in questions {
      let Some(entry) = key.get(&q.number) else {
        debug!(target: "grading", number = q.number, "No answer key entry; skipping question");
        continue;
      };
      if let Some(t) = entry.question_type.filter(|t| *t != q.question_type) {
        debug!(target: "grading", number = q.number, segmented = %q.question_type, key = %t, "Answer key type differs from segmented type");
      }
      details.push(self.grade_one(q, entry).await);
    }

    let report = aggregate(details);
    info!(
      target: "grading",
      total_score = report.summary.total_score,
      total_points = report.summary.total_points,
      graded = report.summary.total_questions,
      "Grading finished"
    );
    Ok(report)
  }

  async fn grade_one(&self, q: &Question, entry: &AnswerKeyEntry) -> GradingDetail {
    let max_points = entry.points.unwrap_or(q.points);
    let student = q.recognized_text.as_str();

    let (outcome, graded_by, keyword_match) = if student.trim().is_empty() {
      (Outcome::no_answer(), GradedBy::Rule, None)
    } else {
      match q.question_type {
        QuestionType::MultipleChoice => {
          (grade_multiple_choice(student, &entry.correct_answer, max_points), GradedBy::Rule, None)
        }
        QuestionType::ShortAnswer => (
          grade_short_answer(student, &entry.correct_answer, max_points, &self.config.grading),
          GradedBy::Rule,
          None,
        ),
        QuestionType::Essay => self.grade_essay(q.number, student, entry, max_points).await,
      }
    };

    GradingDetail {
      question_number: q.number,
      question_type: q.question_type,
      student_answer: q.recognized_text.clone(),
      correct_answer: entry.correct_answer.clone(),
      is_correct: outcome.is_correct,
      earned_points: outcome.earned_points.clamp(0.0, max_points),
      max_points,
      similarity: outcome.similarity,
      feedback: outcome.feedback,
      graded_by,
      keyword_match,
    }
  }

  async fn grade_essay(
    &self,
    number: u32,
    student: &str,
    entry: &AnswerKeyEntry,
    max_points: f64,
  ) -> (Outcome, GradedBy, Option<KeywordMatch>) {
    let keywords = match &entry.keywords {
      Some(k) if !k.is_empty() => k.clone(),
      _ => extract_keywords(&entry.correct_answer, self.config.essay.max_keywords),
    };
    let req = EssayRequest {
      student_answer: student.to_string(),
      correct_answer: entry.correct_answer.clone(),
      max_points,
      keywords,
      rubric: entry.rubric.clone(),
    };

    let (assessment, graded_by) = match &self.provider {
      None => (self.reference.assess(&req), GradedBy::Heuristic),
      Some(provider) => match self.call_provider(provider.as_ref(), &req).await {
        Ok(a) => (a.clamped(max_points), GradedBy::Provider),
        Err(e) => {
          warn!(target: "grading", number, provider = provider.name(), error = %e, "Essay provider failed; using weighted heuristic");
          let mut a = self.reference.assess(&req);
          a.feedback = format!("(fallback) {}", a.feedback);
          (a, GradedBy::Fallback)
        }
      },
    };

    let outcome = Outcome {
      is_correct: assessment.percentage >= self.config.essay.correct_percentage,
      earned_points: assessment.score,
      similarity: assessment.similarity,
      feedback: assessment.feedback,
    };
    (outcome, graded_by, assessment.keyword_match)
  }

  async fn call_provider(&self, provider: &dyn EssayGrader, req: &EssayRequest) -> Result<EssayAssessment, ProviderError> {
    let limit = self.config.essay.provider_timeout();
    match tokio::time::timeout(limit, provider.grade_essay(req)).await {
      Ok(res) => res,
      Err(_) => Err(ProviderError::Timeout(limit)),
    }
  }
}

fn valid_points(p: f64) -> bool {
  p.is_finite() && p >= 0.0
}

/// Batch checks that must pass before anything is scored.
fn validate<'a>(
  questions: &[Question],
  answer_key: &'a [AnswerKeyEntry],
) -> Result<HashMap<u32, &'a AnswerKeyEntry>, GradingError> {
  if questions.is_empty() {
    return Err(GradingError::EmptyQuestions);
  }
  if answer_key.is_empty() {
    return Err(GradingError::EmptyAnswerKey);
  }

  let mut key = HashMap::with_capacity(answer_key.len());
  for entry in answer_key {
    let question_number = entry.question_number;
    if entry.correct_answer.trim().is_empty() {
      return Err(GradingError::MissingCorrectAnswer { question_number });
    }
    if let Some(value) = entry.points.filter(|p| !valid_points(*p)) {
      return Err(GradingError::InvalidPoints { question_number, value });
    }
    if key.insert(question_number, entry).is_some() {
      return Err(GradingError::DuplicateKeyEntry { question_number });
    }
  }

  for q in questions {
    if let Some(entry) = key.get(&q.number) {
      let value = entry.points.unwrap_or(q.points);
      if !valid_points(value) {
        return Err(GradingError::InvalidPoints { question_number: q.number, value });
      }
    }
  }
  Ok(key)
}

fn aggregate(details: Vec<GradingDetail>) -> GradingReport {
  let mut summary = GradingSummary { total_questions: details.len(), ..Default::default() };
  let mut type_stats: BTreeMap<QuestionType, TypeStats> = BTreeMap::new();
  let mut raw_score = 0.0;

  for d in &details {
    raw_score += d.earned_points;
    summary.total_points += d.max_points;
    if d.is_correct {
      summary.correct_count += 1;
    } else if d.is_partial() {
      summary.partial_count += 1;
    } else {
      summary.wrong_count += 1;
    }

    let s = type_stats.entry(d.question_type).or_default();
    s.total += 1;
    s.correct += usize::from(d.is_correct);
    s.points += d.earned_points;
    s.max_points += d.max_points;
  }

  summary.total_score = round1(raw_score);
  summary.percentage = if summary.total_points > 0.0 {
    (raw_score / summary.total_points * 1000.0).round() / 10.0
  } else {
    0.0
  };
  for s in type_stats.values_mut() {
    s.points = round1(s.points);
  }

  GradingReport { summary, details, type_stats }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use async_trait::async_trait;

  use super::*;

  fn q(number: u32, t: QuestionType, text: &str) -> Question {
    Question {
      number,
      question_type: t,
      prompt: String::new(),
      recognized_text: text.into(),
      confidence: 0.9,
      points: crate::config::DefaultPoints::default().for_type(t),
      ambiguous: false,
    }
  }

  fn key(number: u32, correct: &str, points: Option<f64>) -> AnswerKeyEntry {
    AnswerKeyEntry {
      question_number: number,
      question_type: None,
      correct_answer: correct.into(),
      points,
      keywords: None,
      rubric: None,
    }
  }

  fn grader() -> Grader {
    Grader::new(GraderConfig::default()).unwrap()
  }

  struct FailingProvider;

  #[async_trait]
  impl EssayGrader for FailingProvider {
    fn name(&self) -> &'static str { "failing" }
    async fn grade_essay(&self, _req: &EssayRequest) -> Result<EssayAssessment, ProviderError> {
      Err(ProviderError::Server { status: 500, body: "boom".into() })
    }
  }

  struct SlowProvider;

  #[async_trait]
  impl EssayGrader for SlowProvider {
    fn name(&self) -> &'static str { "slow" }
    async fn grade_essay(&self, _req: &EssayRequest) -> Result<EssayAssessment, ProviderError> {
      tokio::time::sleep(Duration::from_secs(3600)).await;
      Err(ProviderError::EmptyResponse)
    }
  }

  struct GenerousProvider;

  #[async_trait]
  impl EssayGrader for GenerousProvider {
    fn name(&self) -> &'static str { "generous" }
    async fn grade_essay(&self, req: &EssayRequest) -> Result<EssayAssessment, ProviderError> {
      Ok(EssayAssessment {
        score: req.max_points * 5.0,
        percentage: 90.0,
        similarity: 0.9,
        feedback: "Great".into(),
        keyword_match: None,
      })
    }
  }

  #[tokio::test]
  async fn empty_inputs_fail_fast() {
    let g = grader();
    let qs = vec![q(1, QuestionType::ShortAnswer, "goes")];
    assert!(matches!(g.grade(&[], &[key(1, "goes", None)]).await, Err(GradingError::EmptyQuestions)));
    assert!(matches!(g.grade(&qs, &[]).await, Err(GradingError::EmptyAnswerKey)));
  }

  #[tokio::test]
  async fn malformed_key_fails_the_whole_batch() {
    let g = grader();
    let qs = vec![q(1, QuestionType::ShortAnswer, "goes"), q(2, QuestionType::ShortAnswer, "went")];
    let err = g.grade(&qs, &[key(1, "goes", None), key(2, "  ", None)]).await.unwrap_err();
    assert!(matches!(err, GradingError::MissingCorrectAnswer { question_number: 2 }));
    let err = g.grade(&qs, &[key(1, "goes", None), key(1, "went", None)]).await.unwrap_err();
    assert!(matches!(err, GradingError::DuplicateKeyEntry { question_number: 1 }));
    let err = g.grade(&qs, &[key(1, "goes", Some(-1.0))]).await.unwrap_err();
    assert!(matches!(err, GradingError::InvalidPoints { question_number: 1, .. }));
  }

  #[tokio::test]
  async fn key_points_override_question_points() {
    let report = grader().grade(&[q(1, QuestionType::ShortAnswer, "goes")], &[key(1, "goes", Some(2.0))]).await.unwrap();
    assert_eq!(report.details[0].max_points, 2.0);
    assert_eq!(report.details[0].earned_points, 2.0);
  }

  #[tokio::test]
  async fn summary_counts_add_up() {
    let qs = vec![
      q(1, QuestionType::MultipleChoice, "③"),
      q(2, QuestionType::ShortAnswer, "goas"),
      q(3, QuestionType::ShortAnswer, "cat"),
      q(4, QuestionType::MultipleChoice, ""),
    ];
    let ak = vec![key(1, "3", None), key(2, "goes", None), key(3, "taller", None), key(4, "2", None)];
    let r = grader().grade(&qs, &ak).await.unwrap();
    let s = &r.summary;
    assert_eq!((s.correct_count, s.partial_count, s.wrong_count), (1, 1, 2));
    assert_eq!(s.correct_count + s.partial_count + s.wrong_count, s.total_questions);
    assert_eq!(s.total_score, 6.8);
    assert_eq!(s.total_points, 16.0);
    assert_eq!(s.percentage, 42.5);
    assert_eq!(r.type_stats[&QuestionType::MultipleChoice].total, 2);
    assert_eq!(r.type_stats[&QuestionType::MultipleChoice].correct, 1);
    assert_eq!(r.type_stats[&QuestionType::ShortAnswer].points, 3.8);
    assert!(r.details[3].feedback.contains("No answer"));
  }

  #[tokio::test]
  async fn heuristic_essay_is_correct_above_cutoff() {
    let text = "I study hard because I want to get good grades.";
    let r = grader().grade(&[q(10, QuestionType::Essay, text)], &[key(10, text, None)]).await.unwrap();
    let d = &r.details[0];
    assert!(d.is_correct);
    assert_eq!(d.earned_points, 10.0);
    assert_eq!(d.graded_by, GradedBy::Heuristic);
    assert!(d.keyword_match.is_some());
  }

  #[tokio::test]
  async fn failing_provider_falls_back_per_question() {
    let g = grader().with_provider(Arc::new(FailingProvider));
    let qs = vec![q(1, QuestionType::Essay, "I study hard because I want good grades."), q(2, QuestionType::ShortAnswer, "went")];
    let ak = vec![key(1, "I study hard because I want to get good grades.", None), key(2, "went", None)];
    let r = g.grade(&qs, &ak).await.unwrap();
    assert_eq!(r.details.len(), 2);
    assert_eq!(r.details[0].graded_by, GradedBy::Fallback);
    assert!(r.details[0].feedback.starts_with("(fallback) "));
    assert!(r.details[0].earned_points > 0.0);
    assert!(r.details[1].is_correct);
  }

  #[tokio::test(start_paused = true)]
  async fn slow_provider_times_out_into_fallback() {
    let g = grader().with_provider(Arc::new(SlowProvider));
    let r = g
      .grade(&[q(1, QuestionType::Essay, "Some essay answer here.")], &[key(1, "Some essay answer here.", None)])
      .await
      .unwrap();
    assert_eq!(r.details[0].graded_by, GradedBy::Fallback);
  }

  #[tokio::test]
  async fn provider_scores_are_clamped() {
    let g = grader().with_provider(Arc::new(GenerousProvider));
    let r = g
      .grade(&[q(1, QuestionType::Essay, "Anything at all, really.")], &[key(1, "Model answer text.", Some(4.0))])
      .await
      .unwrap();
    let d = &r.details[0];
    assert_eq!(d.graded_by, GradedBy::Provider);
    assert_eq!(d.earned_points, 4.0);
    assert!(d.is_correct);
  }

  #[tokio::test]
  async fn empty_essay_never_reaches_the_provider() {
    let g = grader().with_provider(Arc::new(GenerousProvider));
    let r = g.grade(&[q(1, QuestionType::Essay, "")], &[key(1, "I am", Some(5.0))]).await.unwrap();
    assert_eq!(r.details[0].earned_points, 0.0);
    assert_eq!(r.details[0].graded_by, GradedBy::Rule);
  }

  #[tokio::test]
  async fn regrading_is_idempotent() {
    let qs = vec![q(1, QuestionType::MultipleChoice, "②"), q(2, QuestionType::Essay, "i went  to school")];
    let ak = vec![key(1, "b", None), key(2, "I went to school yesterday.", None)];
    let g = grader();
    assert_eq!(g.grade(&qs, &ak).await.unwrap(), g.grade(&qs, &ak).await.unwrap());
  }

  #[test]
  fn threshold_override_is_validated() {
    let g = grader();
    let err = g.with_thresholds(Thresholds { fuzzy_threshold: 0.9, short_answer_threshold: 0.5 }).unwrap_err();
    assert!(matches!(err, GradingError::Config(ConfigError::ThresholdOrder { .. })));
    let err = g.with_thresholds(Thresholds { fuzzy_threshold: 0.5, short_answer_threshold: 1.2 }).unwrap_err();
    assert!(matches!(err, GradingError::Config(ConfigError::ThresholdOutOfRange { .. })));
    let g2 = g.with_thresholds(Thresholds { fuzzy_threshold: 0.5, short_answer_threshold: 0.6 }).unwrap();
    assert_eq!(g2.config().grading.fuzzy_threshold, 0.5);
  }

  #[test]
  fn zero_total_points_gives_zero_percentage() {
    let r = aggregate(vec![]);
    assert_eq!(r.summary.percentage, 0.0);
    assert_eq!(r.summary.total_questions, 0);
  }
}
