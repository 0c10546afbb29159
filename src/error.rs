//! Error types for configuration, batch validation, and the external collaborators.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("{name} must be within [0, 1], got {value}")]
  ThresholdOutOfRange { name: &'static str, value: f64 },

  #[error("short_answer_threshold ({short}) must not be below fuzzy_threshold ({fuzzy})")]
  ThresholdOrder { short: f64, fuzzy: f64 },

  #[error("essay weight {name} must be non-negative, got {value}")]
  NegativeWeight { name: &'static str, value: f64 },

  #[error("essay weights must sum to 1.0, got {0}")]
  WeightSum(f64),

  #[error("essay correct_percentage must be within [0, 100], got {0}")]
  CutoffOutOfRange(f64),

  #[error("default points for {name} must be non-negative, got {value}")]
  NegativePoints { name: &'static str, value: f64 },

  #[error("environment variable {name} is not a valid value: {value}")]
  BadEnv { name: &'static str, value: String },

  #[error("failed to read config file {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: toml::de::Error,
  },
}

/// Whole-batch failures. Raised before any question is scored.
#[derive(Debug, Error)]
pub enum GradingError {
  #[error("no questions to grade")]
  EmptyQuestions,

  #[error("answer key is empty")]
  EmptyAnswerKey,

  #[error("answer key entry for question {question_number} has no correct answer")]
  MissingCorrectAnswer { question_number: u32 },

  #[error("answer key has more than one entry for question {question_number}")]
  DuplicateKeyEntry { question_number: u32 },

  #[error("points for question {question_number} must be a non-negative number, got {value}")]
  InvalidPoints { question_number: u32, value: f64 },

  #[error(transparent)]
  Config(#[from] ConfigError),
}

/// Essay provider failures. Absorbed by the grader's fallback.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("provider returned {status}: {body}")]
  Server { status: u16, body: String },

  #[error("JSON parse error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("provider returned no content")]
  EmptyResponse,

  #[error("provider did not answer within {0:?}")]
  Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum RecognitionError {
  #[error("text recognition failed on page {page}: {reason}")]
  Failed { page: usize, reason: String },

  #[error("no pages to recognize")]
  NoPages,
}
