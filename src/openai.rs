//! Minimal OpenAI client for our use-cases.
//!
//! We only call chat.completions and request either plain text or a strict
//! JSON object. Calls are instrumented and log model names, latencies, and
//! response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Settings;
use crate::error::GeneratorError;
use crate::util::trunc_for_log;

/// One external generation call. `json_mode` asks the remote for a strict
/// JSON object; the caller is responsible for parsing it.
#[derive(Clone, Debug)]
pub struct GenerateTextRequest {
  pub system: String,
  pub prompt: String,
  pub model: String,
  pub max_tokens: u32,
  pub json_mode: bool,
}

/// Seam over the expensive external text generator, so the engine can be
/// exercised with a scripted double in tests.
#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn generate_text(&self, req: GenerateTextRequest) -> Result<String, GeneratorError>;
}

#[derive(Clone)]
pub struct OpenAi {
  client: reqwest::Client,
  api_key: String,
  base_url: String,
}

impl OpenAi {
  /// Build the client from settings. An empty API key still constructs;
  /// calls will then fail remotely and surface as generation failures.
  pub fn new(settings: &Settings) -> Result<Self, GeneratorError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(settings.request_timeout_secs))
      .build()
      .map_err(|e| GeneratorError::Failed(format!("failed to build HTTP client: {e}")))?;

    Ok(Self {
      client,
      api_key: settings.openai_api_key.clone(),
      base_url: settings.openai_base_url.clone(),
    })
  }
}

#[async_trait]
impl TextGenerator for OpenAi {
  #[instrument(level = "info", skip(self, req), fields(model = %req.model, json_mode = req.json_mode, max_tokens = req.max_tokens))]
  async fn generate_text(&self, req: GenerateTextRequest) -> Result<String, GeneratorError> {
    let url = format!("{}/chat/completions", self.base_url);
    let body = ChatCompletionRequest {
      model: req.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: req.system },
        ChatMessageReq { role: "user".into(), content: req.prompt },
      ],
      max_tokens: Some(req.max_tokens),
      response_format: req.json_mode.then(|| ResponseFormat { r#type: "json_object".into() }),
    };

    let start = std::time::Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "cluestory-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&body)
      .send()
      .await
      .map_err(|e| GeneratorError::Failed(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 300));
      error!(target: "cluestory_backend", %status, elapsed = ?start.elapsed(), "OpenAI call failed");
      return Err(GeneratorError::Failed(format!("OpenAI HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| GeneratorError::Failed(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, elapsed = ?start.elapsed(), "OpenAI usage");
    }
    let text = body
      .choices
      .first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default()
      .trim()
      .to_string();

    Ok(text)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
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
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
