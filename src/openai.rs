//! OpenAI-backed essay grader.
//!
//! A single chat.completions call in JSON-object mode per essay. Calls are
//! instrumented and log model name, latency and token usage (never answer text).
//! Any failure is returned as a `ProviderError`; the grader decides the fallback.
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::Prompts;
use crate::domain::KeywordMatch;
use crate::error::ProviderError;
use crate::strategy::{EssayAssessment, EssayGrader, EssayRequest};
use crate::util::{fill_template, trunc_for_log};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Clone)]
pub struct OpenAiEssayGrader {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  prompts: Prompts,
}

impl OpenAiEssayGrader {
  pub fn new(api_key: String, base_url: String, model: String, prompts: Prompts, timeout: Duration) -> Result<Self, ProviderError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model, prompts })
  }

  /// Construct the grader from OPENAI_API_KEY / OPENAI_BASE_URL / OPENAI_MODEL.
  /// `Ok(None)` when no key is set; a client that cannot be built is an error.
  pub fn from_env(prompts: Prompts, timeout: Duration) -> Result<Option<Self>, ProviderError> {
    Self::from_lookup(|k| std::env::var(k).ok(), prompts, timeout)
  }

  fn from_lookup<F>(lookup: F, prompts: Prompts, timeout: Duration) -> Result<Option<Self>, ProviderError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let Some(api_key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) else {
      return Ok(None);
    };
    let base_url = lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
    let model = lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into());
    Self::new(api_key, base_url, model, prompts, timeout).map(Some)
  }

  fn user_prompt(&self, req: &EssayRequest) -> String {
    let max_points = req.max_points.to_string();
    let student = if req.student_answer.trim().is_empty() { "(no answer)" } else { req.student_answer.as_str() };
    let keywords = if req.keywords.is_empty() { "(none)".to_string() } else { req.keywords.join(", ") };
    fill_template(
      &self.prompts.essay_user_template,
      &[
        ("max_points", max_points.as_str()),
        ("correct_answer", req.correct_answer.as_str()),
        ("student_answer", student),
        ("keywords", keywords.as_str()),
        ("rubric", req.rubric.as_deref().unwrap_or("(none)")),
      ],
    )
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(&self, system: &str, user: &str, temperature: f32) -> Result<T, ProviderError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
      max_tokens: Some(800),
    };

    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "exam-grader/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let body = extract_openai_error(&body).unwrap_or(body);
      return Err(ProviderError::Server { status, body });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .filter(|t| !t.trim().is_empty())
      .ok_or(ProviderError::EmptyResponse)?;
    debug!(response = %trunc_for_log(&text, 200), "OpenAI raw response");

    Ok(serde_json::from_str::<T>(&text)?)
  }
}

#[async_trait]
impl EssayGrader for OpenAiEssayGrader {
  fn name(&self) -> &'static str {
    "openai"
  }

  #[instrument(level = "info", skip(self, req), fields(model = %self.model, answer_len = req.student_answer.len(), max_points = req.max_points))]
  async fn grade_essay(&self, req: &EssayRequest) -> Result<EssayAssessment, ProviderError> {
    let user = self.user_prompt(req);
    let start = Instant::now();
    let parsed: ModelGrade = self.chat_json(&self.prompts.essay_system, &user, 0.1).await?;
    info!(elapsed = ?start.elapsed(), "Essay graded by model");
    Ok(parsed.into_assessment(req.max_points))
  }
}

/// Shape requested from the model in the system prompt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelGrade {
  #[serde(default)]
  score: f64,
  #[serde(default)]
  percentage: Option<f64>,
  #[serde(default)]
  similarity: f64,
  #[serde(default)]
  feedback: String,
  #[serde(default)]
  keyword_match: Option<KeywordMatch>,
}

impl ModelGrade {
  fn into_assessment(self, max_points: f64) -> EssayAssessment {
    let percentage = self.percentage.unwrap_or_else(|| {
      if max_points > 0.0 { self.score / max_points * 100.0 } else { 0.0 }
    });
    let feedback = if self.feedback.trim().is_empty() { "Graded.".to_string() } else { self.feedback };
    EssayAssessment { score: self.score, percentage, similarity: self.similarity, feedback, keyword_match: self.keyword_match }
      .clamped(max_points)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
