//! Tracing setup for the service binary.
//!
//! `LOG_LEVEL` holds EnvFilter directives; `LOG_FORMAT` is `pretty` (default),
//! `compact` or `json`. Grading events use the `grading` target, everything
//! else (startup, recognition, HTTP) uses `exam_grader`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,grading=debug,exam_grader=debug,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Compact,
  Json,
}

impl LogFormat {
  /// Unknown or missing values fall back to `Pretty`.
  pub fn parse(value: Option<&str>) -> Self {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
      Some("json") => LogFormat::Json,
      Some("compact") => LogFormat::Compact,
      _ => LogFormat::Pretty,
    }
  }
}

pub fn init_tracing() {
  let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
  let format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(true)
    .with_file(true)
    .with_line_number(true);

  // Each formatter is a distinct subscriber type, so init per arm.
  match format {
    LogFormat::Json => builder.json().with_current_span(true).init(),
    LogFormat::Compact => builder.compact().init(),
    LogFormat::Pretty => builder.init(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn format_parsing() {
    assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
    assert_eq!(LogFormat::parse(Some(" JSON ")), LogFormat::Json);
    assert_eq!(LogFormat::parse(Some("compact")), LogFormat::Compact);
    assert_eq!(LogFormat::parse(Some("fancy")), LogFormat::Pretty);
    assert_eq!(LogFormat::parse(None), LogFormat::Pretty);
  }
}
