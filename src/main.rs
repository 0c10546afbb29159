//! Exam Grader · HTTP service
//!
//! - Axum HTTP API over the segmentation and grading engine
//! - Optional OpenAI essay grading (via environment variables)
//!
//! Important env variables:
//!   PORT                    : u16 (default 3001)
//!   GRADER_CONFIG_PATH      : path to TOML config (thresholds, essay weights, points, prompts)
//!   FUZZY_MATCH_THRESHOLD   : partial-credit similarity for short answers (default 0.7)
//!   SHORT_ANSWER_THRESHOLD  : full-credit similarity for short answers (default 0.8)
//!   AI_MODE                 : "mock" (default) or "openai"
//!   OPENAI_API_KEY          : required for AI_MODE=openai
//!   OPENAI_BASE_URL         : default "https://api.openai.com/v1"
//!   OPENAI_MODEL            : default "gpt-4o"
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default), "compact" or "json"

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::{error, info};

use exam_grader::routes::build_router;
use exam_grader::state::AppState;
use exam_grader::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Invalid configuration is fatal at startup, never discovered mid-grade.
  let state = match AppState::from_env() {
    Ok(s) => Arc::new(s),
    Err(e) => {
      error!(target: "exam_grader", error = %e, "Invalid grader configuration");
      return Err(e.into());
    }
  };

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3001)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "exam_grader", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!(target: "exam_grader", "Shutdown signal received");
    })
    .await?;
  Ok(())
}
