//! HTTP endpoint handlers. These are thin wrappers that forward to the engine.
//! Each handler is instrumented and logs sizes and basic result info.

use std::sync::Arc;
use std::time::Instant;

use axum::{
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{GradingError, RecognitionError};
use crate::protocol::*;
use crate::recognition::recognize_pages;
use crate::state::AppState;

/// Error half of the response envelope.
#[derive(Debug)]
pub struct ApiError {
  status: StatusCode,
  code: &'static str,
  message: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = ErrorOut { success: false, error: ErrorBody { code: self.code, message: self.message } };
    (self.status, Json(body)).into_response()
  }
}

impl From<GradingError> for ApiError {
  fn from(e: GradingError) -> Self {
    let code = match e {
      GradingError::Config(_) => "INVALID_CONFIG",
      _ => "VALIDATION_ERROR",
    };
    Self { status: StatusCode::BAD_REQUEST, code, message: e.to_string() }
  }
}

impl From<RecognitionError> for ApiError {
  fn from(e: RecognitionError) -> Self {
    let (status, code) = match e {
      RecognitionError::NoPages => (StatusCode::BAD_REQUEST, "NO_IMAGES"),
      RecognitionError::Failed { .. } => (StatusCode::BAD_GATEWAY, "OCR_ERROR"),
    };
    Self { status, code, message: e.to_string() }
  }
}

pub async fn http_not_found() -> ApiError {
  ApiError { status: StatusCode::NOT_FOUND, code: "NOT_FOUND", message: "no such endpoint".into() }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, provider: state.grader.provider_name() })
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_segment(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SegmentIn>,
) -> impl IntoResponse {
  let questions = state.segmenter.segment(&body.text);
  info!(target: "exam_grader", questions = questions.len(), "HTTP segment served");
  Json(Envelope::ok(SegmentOut::new(questions)))
}

#[instrument(level = "info", skip(state, body), fields(pages = body.image_paths.len()))]
pub async fn http_post_ocr_process(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RecognizeIn>,
) -> Result<Json<Envelope<RecognizeOut>>, ApiError> {
  let recognition = recognize_pages(state.recognizer.as_ref(), body.image_paths.as_slice()).await?;
  let questions = state.segmenter.segment(&recognition.full_text);
  info!(target: "exam_grader", questions = questions.len(), confidence = recognition.confidence, "HTTP ocr/process served");
  Ok(Json(Envelope::ok(RecognizeOut { confidence: recognition.confidence, segments: SegmentOut::new(questions) })))
}

#[instrument(level = "info", skip(state, body), fields(questions = body.questions.len(), key_entries = body.answer_key.len()))]
pub async fn http_post_grade(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GradeIn>,
) -> Result<Json<Envelope<GradeOut>>, ApiError> {
  let start = Instant::now();
  let overridden;
  let grader = if body.grading_options.is_empty() {
    &state.grader
  } else {
    let thresholds = body.grading_options.apply(state.grader.config().grading);
    overridden = state.grader.with_thresholds(thresholds)?;
    &overridden
  };

  let report = grader.grade(&body.questions, &body.answer_key).await.map_err(|e| {
    warn!(target: "grading", error = %e, "Grading request rejected");
    ApiError::from(e)
  })?;

  let id = Uuid::new_v4().to_string();
  let elapsed = start.elapsed().as_millis();
  info!(
    target: "grading",
    grading_result_id = %id,
    total_score = report.summary.total_score,
    percentage = report.summary.percentage,
    elapsed_ms = elapsed as u64,
    "HTTP grade evaluated"
  );
  Ok(Json(Envelope::ok(GradeOut::new(id, report, elapsed))))
}
