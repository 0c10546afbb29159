//! Exam answer grading engine.
//!
//! Recognized exam text is split into typed questions by [`segment::Segmenter`]
//! and graded against an instructor answer key by [`grader::Grader`].
//! Multiple-choice and short-answer grading are deterministic rules; essays go
//! through a pluggable [`strategy::EssayGrader`] with the weighted heuristic as
//! reference and fallback.

pub mod config;
pub mod domain;
pub mod error;
pub mod grader;
pub mod grammar;
pub mod keywords;
pub mod normalize;
pub mod openai;
pub mod protocol;
pub mod recognition;
pub mod routes;
pub mod segment;
pub mod similarity;
pub mod state;
pub mod strategy;
pub mod telemetry;
pub mod util;

pub use config::{GraderConfig, Thresholds};
pub use domain::{AnswerKeyEntry, GradingDetail, GradingReport, GradingSummary, Question, QuestionType};
pub use error::{ConfigError, GradingError, ProviderError, RecognitionError};
pub use grader::Grader;
pub use segment::Segmenter;
pub use strategy::{EssayAssessment, EssayGrader, EssayRequest, HeuristicEssayGrader};
