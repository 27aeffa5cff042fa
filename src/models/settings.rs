use serde::{Deserialize, Serialize};
use clap::ValueEnum;
use std::fmt;
use std::str::FromStr;
use super::paper::Source;

/// External summarization backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Google Generative Language API
    #[default]
    Gemini,
    /// Local model served by Ollama
    Ollama,
    /// The `claude` CLI in print mode
    Claude,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Gemini => "gemini",
            Backend::Ollama => "ollama",
            Backend::Claude => "claude",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Backend::Gemini),
            "ollama" => Ok(Backend::Ollama),
            "claude" => Ok(Backend::Claude),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}

fn default_sources() -> Vec<Source> {
    vec![Source::OpenAlex, Source::Crossref]
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_ollama_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_max_results() -> usize {
    50
}

fn default_max_words() -> usize {
    60
}

fn default_min_words() -> usize {
    15
}

fn default_max_input_tokens() -> usize {
    1024
}

fn default_preview() -> usize {
    20
}

fn default_timeout_secs() -> u64 {
    15
}

/// User settings, stored as JSON; every field falls back to its default
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    /// Usually supplied through `GOOGLE_API_KEY` instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,
    /// Contact address sent to OpenAlex and Crossref
    #[serde(default)]
    pub mailto: Option<String>,
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    #[serde(default = "default_min_words")]
    pub min_words: usize,
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
    #[serde(default = "default_preview")]
    pub preview: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            gemini_model: default_gemini_model(),
            gemini_api_key: None,
            ollama_model: default_ollama_model(),
            ollama_base_url: default_ollama_base_url(),
            mailto: None,
            sources: default_sources(),
            max_results: default_max_results(),
            max_words: default_max_words(),
            min_words: default_min_words(),
            max_input_tokens: default_max_input_tokens(),
            preview: default_preview(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"backend": "ollama", "max_words": 40}"#).unwrap();
        assert_eq!(settings.backend, Backend::Ollama);
        assert_eq!(settings.max_words, 40);
        assert_eq!(settings.min_words, 15);
        assert_eq!(settings.sources, vec![Source::OpenAlex, Source::Crossref]);
    }

    #[test]
    fn test_api_key_not_written_when_absent() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert!(!json.contains("gemini_api_key"));
    }
}
