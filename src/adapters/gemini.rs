//! Google Gemini client
//!
//! Text generation through the Generative Language API.
//! See: https://ai.google.dev/api/generate-content

use super::LanguageModel;
use crate::error::{LitError, Result};
use crate::utils::http::{build_client, check_status, rate_limiters, with_retry, RetryConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Environment variables checked for an API key, in order
pub const API_KEY_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "empty response".to_string());
            return Err(LitError::backend("gemini", reason));
        }
        Ok(text)
    }
}

/// Look up the API key in the environment
pub fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|key| !key.trim().is_empty())
}

/// Client for the Gemini API
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    retry: RetryConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Arguments
    /// * `model` - Model name, e.g. `gemini-1.5-flash`
    /// * `api_key` - Explicit key; falls back to `GOOGLE_API_KEY` / `GEMINI_API_KEY`
    pub fn new(model: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(api_key_from_env)
            .ok_or(LitError::MissingApiKey("GOOGLE_API_KEY"))?;

        Ok(Self {
            client: build_client(timeout, None)?,
            api_key,
            model: model.to_string(),
            retry: RetryConfig {
                max_retries: 3,
                initial_backoff: Duration::from_secs(2),
                max_backoff: Duration::from_secs(30),
                multiplier: 2.0,
            },
        })
    }

    fn request_body(prompt: &str, max_output_tokens: u32) -> GenerateRequest<'_> {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String> {
        rate_limiters::GEMINI.wait_for_slot("gemini").await;

        let url = format!("{}/{}:generateContent", API_BASE, self.model);
        let body = Self::request_body(prompt, max_output_tokens);

        debug!("Gemini request to {} ({} chars)", self.model, prompt.len());

        let resp: GenerateResponse = with_retry(
            &self.retry,
            &format!("Gemini {} request", self.model),
            || {
                let request = self
                    .client
                    .post(&url)
                    .header("x-goog-api-key", &self.api_key)
                    .json(&body);
                async move {
                    let resp = check_status(request.send().await?).await?;
                    resp.json::<GenerateResponse>()
                        .await
                        .map_err(|e| LitError::Parse(e.to_string()))
                }
            },
            LitError::is_retryable,
        )
        .await?;

        resp.into_text()
    }
}
