//! External service adapters
//!
//! This module contains adapters for external services and APIs:
//! - OpenAlex, Crossref, arXiv: paper metadata and abstracts
//! - Gemini, Ollama, Claude CLI: pretrained text generation backends
//! - Filesystem: CSV export and input text files

pub mod arxiv;
pub mod claude_cli;
pub mod crossref;
pub mod filesystem;
pub mod gemini;
pub mod ollama;
pub mod openalex;

use crate::error::{LitError, Result};
use crate::models::{Backend, Settings};
use async_trait::async_trait;
use std::time::Duration;

// Re-export commonly used types
pub use arxiv::ArxivClient;
pub use claude_cli::ClaudeCliClient;
pub use crossref::CrossrefClient;
pub use filesystem::FileSystemAdapter;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openalex::OpenAlexClient;

/// A pretrained text generation backend, used as a black box
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short backend name for logs and messages
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String>;
}

/// Build the language model the settings select
pub fn language_model(settings: &Settings) -> Result<Box<dyn LanguageModel>> {
    let timeout = Duration::from_secs(settings.timeout_secs.max(30));
    match settings.backend {
        Backend::Gemini => Ok(Box::new(GeminiClient::new(
            &settings.gemini_model,
            settings.gemini_api_key.clone(),
            timeout,
        )?)),
        Backend::Ollama => Ok(Box::new(OllamaClient::new(
            &settings.ollama_model,
            &settings.ollama_base_url,
            timeout,
        )?)),
        Backend::Claude => Ok(Box::new(ClaudeCliClient::new())),
    }
}

/// Validate a backend name from the environment or a flag
pub fn parse_backend(name: &str) -> Result<Backend> {
    name.parse().map_err(LitError::Config)
}
