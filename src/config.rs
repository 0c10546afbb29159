//! Grading configuration: thresholds, essay weights, default points, provider
//! selection, and essay prompts.
//!
//! Loaded once from TOML (`GRADER_CONFIG_PATH`) with environment overrides and
//! validated before anything is graded. See `GraderConfig` for the schema.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::domain::QuestionType;
use crate::error::ConfigError;

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct GraderConfig {
  pub grading: Thresholds,
  pub essay: EssayConfig,
  pub points: DefaultPoints,
  pub prompts: Prompts,
}

/// Short-answer fuzzy match thresholds.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Thresholds {
  /// Minimum similarity that earns partial credit.
  pub fuzzy_threshold: f64,
  /// Minimum similarity that earns full credit.
  pub short_answer_threshold: f64,
}

impl Default for Thresholds {
  fn default() -> Self {
    Self { fuzzy_threshold: 0.7, short_answer_threshold: 0.8 }
  }
}

impl Thresholds {
  pub fn validate(&self) -> Result<(), ConfigError> {
    for (name, value) in [
      ("fuzzy_threshold", self.fuzzy_threshold),
      ("short_answer_threshold", self.short_answer_threshold),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ThresholdOutOfRange { name, value });
      }
    }
    if self.short_answer_threshold < self.fuzzy_threshold {
      return Err(ConfigError::ThresholdOrder {
        short: self.short_answer_threshold,
        fuzzy: self.fuzzy_threshold,
      });
    }
    Ok(())
  }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EssayProvider {
  /// Weighted heuristic only.
  #[default]
  #[serde(alias = "mock")]
  Heuristic,
  /// Remote chat-completions model, falling back to the heuristic.
  #[serde(alias = "openai")]
  OpenAi,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EssayConfig {
  pub similarity_weight: f64,
  pub keyword_weight: f64,
  pub grammar_weight: f64,
  /// Percentage at or above which an essay counts as correct.
  pub correct_percentage: f64,
  /// Cap on keywords auto-extracted from the model answer.
  pub max_keywords: usize,
  pub provider: EssayProvider,
  pub provider_timeout_secs: u64,
}

impl Default for EssayConfig {
  fn default() -> Self {
    Self {
      similarity_weight: 0.4,
      keyword_weight: 0.4,
      grammar_weight: 0.2,
      correct_percentage: 80.0,
      max_keywords: 5,
      provider: EssayProvider::Heuristic,
      provider_timeout_secs: 20,
    }
  }
}

impl EssayConfig {
  pub fn provider_timeout(&self) -> Duration {
    Duration::from_secs(self.provider_timeout_secs)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let weights = [
      ("similarity_weight", self.similarity_weight),
      ("keyword_weight", self.keyword_weight),
      ("grammar_weight", self.grammar_weight),
    ];
    for (name, value) in weights {
      if !(value >= 0.0) {
        return Err(ConfigError::NegativeWeight { name, value });
      }
    }
    let sum: f64 = weights.iter().map(|(_, w)| w).sum();
    if (sum - 1.0).abs() > 1e-6 {
      return Err(ConfigError::WeightSum(sum));
    }
    if !(0.0..=100.0).contains(&self.correct_percentage) {
      return Err(ConfigError::CutoffOutOfRange(self.correct_percentage));
    }
    Ok(())
  }
}

/// Points assigned to a segmented question before the answer key overrides them.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DefaultPoints {
  pub multiple_choice: f64,
  pub short_answer: f64,
  pub essay: f64,
}

impl Default for DefaultPoints {
  fn default() -> Self {
    Self { multiple_choice: 3.0, short_answer: 5.0, essay: 10.0 }
  }
}

impl DefaultPoints {
  pub fn for_type(&self, t: QuestionType) -> f64 {
    match t {
      QuestionType::MultipleChoice => self.multiple_choice,
      QuestionType::ShortAnswer => self.short_answer,
      QuestionType::Essay => self.essay,
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    for (name, value) in [
      ("multiple_choice", self.multiple_choice),
      ("short_answer", self.short_answer),
      ("essay", self.essay),
    ] {
      if !(value >= 0.0) {
        return Err(ConfigError::NegativePoints { name, value });
      }
    }
    Ok(())
  }
}

/// Prompts for the remote essay grader. Override in TOML to tune tone or language.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub essay_system: String,
  pub essay_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      essay_system: "You are a middle-school English teacher grading exam answers. Grade objectively and consistently. Deduct for minor spelling errors but give partial credit when the meaning is conveyed. Weigh grammatical accuracy, meaning, and use of key terms. Respond ONLY with strict JSON: {\"score\": number, \"percentage\": number, \"similarity\": number between 0 and 1, \"feedback\": string, \"keywordMatch\": {\"matched\": [string], \"missed\": [string], \"matchRate\": number}}".into(),
      essay_user_template: "Grade the following student answer.\nMaximum points: {max_points}\nModel answer: {correct_answer}\nStudent answer: {student_answer}\nKey terms: {keywords}\nRubric: {rubric}".into(),
    }
  }
}

impl GraderConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.grading.validate()?;
    self.essay.validate()?;
    self.points.validate()
  }

  /// Parse a TOML document and validate it.
  pub fn from_toml_str(s: &str, path: &str) -> Result<Self, ConfigError> {
    let cfg: GraderConfig = toml::from_str(s)
      .map_err(|source| ConfigError::Parse { path: path.to_string(), source })?;
    cfg.validate()?;
    Ok(cfg)
  }

  /// Apply `FUZZY_MATCH_THRESHOLD`, `SHORT_ANSWER_THRESHOLD` and `AI_MODE`
  /// from a variable lookup. Split out from [`GraderConfig::load`] for tests.
  pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(v) = lookup("FUZZY_MATCH_THRESHOLD") {
      self.grading.fuzzy_threshold = parse_env("FUZZY_MATCH_THRESHOLD", &v)?;
    }
    if let Some(v) = lookup("SHORT_ANSWER_THRESHOLD") {
      self.grading.short_answer_threshold = parse_env("SHORT_ANSWER_THRESHOLD", &v)?;
    }
    if let Some(v) = lookup("AI_MODE") {
      self.essay.provider = match v.trim().to_ascii_lowercase().as_str() {
        "mock" | "heuristic" => EssayProvider::Heuristic,
        "openai" => EssayProvider::OpenAi,
        _ => return Err(ConfigError::BadEnv { name: "AI_MODE", value: v }),
      };
    }
    Ok(())
  }

  /// File (if `GRADER_CONFIG_PATH` is set), then environment overrides, then validation.
  pub fn load() -> Result<Self, ConfigError> {
    let mut cfg = match std::env::var("GRADER_CONFIG_PATH") {
      Ok(path) => {
        let s = std::fs::read_to_string(&path)
          .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
        let cfg = Self::from_toml_str(&s, &path)?;
        info!(target: "exam_grader", %path, "Loaded grader config (TOML)");
        cfg
      }
      Err(_) => GraderConfig::default(),
    };
    cfg.apply_env(|k| std::env::var(k).ok())?;
    cfg.validate()?;
    Ok(cfg)
  }
}

fn parse_env(name: &'static str, value: &str) -> Result<f64, ConfigError> {
  value
    .trim()
    .parse::<f64>()
    .map_err(|_| ConfigError::BadEnv { name, value: value.to_string() })
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  #[test]
  fn defaults_are_valid() {
    let cfg = GraderConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.grading.fuzzy_threshold, 0.7);
    assert_eq!(cfg.grading.short_answer_threshold, 0.8);
    assert_eq!(cfg.points.for_type(QuestionType::Essay), 10.0);
  }

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg = GraderConfig::from_toml_str(
      "[grading]\nfuzzy_threshold = 0.6\n\n[essay]\nprovider = \"openai\"\n",
      "test.toml",
    )
    .unwrap();
    assert_eq!(cfg.grading.fuzzy_threshold, 0.6);
    assert_eq!(cfg.grading.short_answer_threshold, 0.8);
    assert_eq!(cfg.essay.provider, EssayProvider::OpenAi);
    assert_eq!(cfg.essay.grammar_weight, 0.2);
  }

  #[test]
  fn rejects_inverted_thresholds() {
    let err = GraderConfig::from_toml_str(
      "[grading]\nfuzzy_threshold = 0.9\nshort_answer_threshold = 0.8\n",
      "t.toml",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ThresholdOrder { .. }));
  }

  #[test]
  fn rejects_out_of_range_threshold() {
    let t = Thresholds { fuzzy_threshold: -0.1, short_answer_threshold: 0.8 };
    assert!(matches!(t.validate(), Err(ConfigError::ThresholdOutOfRange { name: "fuzzy_threshold", .. })));
    let t = Thresholds { fuzzy_threshold: 0.7, short_answer_threshold: 1.5 };
    assert!(t.validate().is_err());
  }

  #[test]
  fn rejects_bad_weights_and_cutoff() {
    let mut e = EssayConfig { grammar_weight: 0.3, ..Default::default() };
    assert!(matches!(e.validate(), Err(ConfigError::WeightSum(_))));
    e = EssayConfig { similarity_weight: -0.2, keyword_weight: 1.0, ..Default::default() };
    assert!(matches!(e.validate(), Err(ConfigError::NegativeWeight { .. })));
    e = EssayConfig { correct_percentage: 120.0, ..Default::default() };
    assert!(matches!(e.validate(), Err(ConfigError::CutoffOutOfRange(_))));
  }

  #[test]
  fn env_overrides_apply() {
    let vars: HashMap<&str, &str> = [
      ("FUZZY_MATCH_THRESHOLD", "0.5"),
      ("SHORT_ANSWER_THRESHOLD", "0.9"),
      ("AI_MODE", "openai"),
    ]
    .into_iter()
    .collect();
    let mut cfg = GraderConfig::default();
    cfg.apply_env(|k| vars.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(cfg.grading.fuzzy_threshold, 0.5);
    assert_eq!(cfg.grading.short_answer_threshold, 0.9);
    assert_eq!(cfg.essay.provider, EssayProvider::OpenAi);
  }

  #[test]
  fn env_garbage_is_rejected() {
    let mut cfg = GraderConfig::default();
    let err = cfg
      .apply_env(|k| (k == "FUZZY_MATCH_THRESHOLD").then(|| "lots".to_string()))
      .unwrap_err();
    assert!(matches!(err, ConfigError::BadEnv { name: "FUZZY_MATCH_THRESHOLD", .. }));
  }

  #[test]
  fn unparsable_toml_reports_path() {
    let err = GraderConfig::from_toml_str("grading = 3", "bad.toml").unwrap_err();
    assert!(err.to_string().contains("bad.toml"));
  }
}
