//! Application state: validated config, segmenter, grader, and collaborators.
//!
//! Everything is built once at startup and injected; nothing reads the
//! environment after `AppState::from_env` returns.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::config::{EssayProvider, GraderConfig};
use crate::error::ConfigError;
use crate::grader::Grader;
use crate::openai::OpenAiEssayGrader;
use crate::recognition::{MockRecognizer, TextRecognizer};
use crate::segment::Segmenter;

#[derive(Clone)]
pub struct AppState {
  pub segmenter: Segmenter,
  pub grader: Grader,
  pub recognizer: Arc<dyn TextRecognizer>,
}

impl AppState {
  /// Heuristic-only state from an explicit config. Used by tests and embedders.
  pub fn new(config: GraderConfig) -> Result<Self, ConfigError> {
    Ok(Self {
      segmenter: Segmenter::new(config.points),
      grader: Grader::new(config)?,
      recognizer: Arc::new(MockRecognizer),
    })
  }

  /// Load config from file + env and attach the essay provider it selects.
  #[instrument(level = "info", skip_all)]
  pub fn from_env() -> Result<Self, ConfigError> {
    let config = GraderConfig::load()?;
    let provider = config.essay.provider;
    let prompts = config.prompts.clone();
    let timeout = config.essay.provider_timeout();
    let mut state = Self::new(config)?;

    match provider {
      EssayProvider::OpenAi => match OpenAiEssayGrader::from_env(prompts, timeout) {
        Ok(Some(oa)) => {
          info!(target: "exam_grader", base_url = %oa.base_url, model = %oa.model, "OpenAI essay grading enabled.");
          state.grader = state.grader.with_provider(Arc::new(oa));
        }
        Ok(None) => {
          warn!(target: "exam_grader", "Essay provider is openai but OPENAI_API_KEY is not set. Using weighted heuristic.");
        }
        Err(e) => {
          error!(target: "exam_grader", error = %e, "OpenAI client could not be built. Using weighted heuristic.");
        }
      },
      EssayProvider::Heuristic => {
        info!(target: "exam_grader", "Essay grading uses the weighted heuristic.");
      }
    }

    let t = &state.grader.config().grading;
    info!(
      target: "exam_grader",
      fuzzy = t.fuzzy_threshold,
      short_answer = t.short_answer_threshold,
      recognizer = state.recognizer.name(),
      "Grader ready"
    );
    Ok(state)
  }
}
