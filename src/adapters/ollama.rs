//! Ollama client
//!
//! Runs a locally served pretrained model through Ollama's chat endpoint.
//! See: https://github.com/ollama/ollama/blob/main/docs/api.md

use super::LanguageModel;
use crate::error::{LitError, Result};
use crate::utils::http::{check_status, with_retry, RetryConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// Client for a local Ollama server
pub struct OllamaClient {
    client: Client,
    base: String,
    model: String,
    retry: RetryConfig,
}

impl OllamaClient {
    /// Create a new Ollama client
    ///
    /// `OLLAMA_BASE_URL` overrides `base_url` when set.
    pub fn new(model: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let base = std::env::var("OLLAMA_BASE_URL")
            .ok()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| base_url.to_string());

        // Local inference is slow on first load
        let client = Client::builder()
            .timeout(timeout.max(Duration::from_secs(120)))
            .build()?;

        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            retry: RetryConfig {
                max_retries: 1,
                initial_backoff: Duration::from_secs(1),
                max_backoff: Duration::from_secs(5),
                multiplier: 2.0,
            },
        })
    }

    /// Whether the server answers at all
    pub async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base))
            .timeout(Duration::from_secs(3))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String> {
        let url = format!("{}/api/chat", self.base);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: ChatOptions {
                temperature: 0.0,
                num_predict: max_output_tokens,
            },
        };

        debug!("Ollama request to {} ({} chars)", self.model, prompt.len());

        let resp: ChatResponse = with_retry(
            &self.retry,
            &format!("Ollama {} request", self.model),
            || {
                let request = self.client.post(&url).json(&body);
                async move {
                    let resp = check_status(request.send().await?).await?;
                    resp.json::<ChatResponse>()
                        .await
                        .map_err(|e| LitError::Parse(e.to_string()))
                }
            },
            LitError::is_retryable,
        )
        .await?;

        if let Some(error) = resp.error {
            return Err(LitError::backend("ollama", error));
        }

        resp.message
            .map(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LitError::backend("ollama", "empty response"))
    }
}
