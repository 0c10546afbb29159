//! HTTP surface of the grader.
//!
//! - `GET  /api/v1/health`
//! - `POST /api/v1/segment`        recognized text -> typed questions
//! - `POST /api/v1/ocr/process`    page images -> recognized, segmented questions
//! - `POST /api/v1/grading/grade`  questions + answer key -> report
//!
//! Unknown paths answer with the JSON error envelope.

use std::sync::Arc;

use axum::{
  extract::DefaultBodyLimit,
  routing::{get, post},
  Router,
};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Exams arrive as JSON text, never as image bytes.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
  let api = Router::new()
    .route("/health", get(http::http_health))
    .route("/segment", post(http::http_post_segment))
    .route("/ocr/process", post(http::http_post_ocr_process))
    .route("/grading/grade", post(http::http_post_grade));

  Router::new()
    .nest("/api/v1", api)
    .fallback(http::http_not_found)
    .with_state(state)
    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
    .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
    .layer(
      TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO).latency_unit(tower_http::LatencyUnit::Millis)),
    )
}
