//! `litfinder check`
//!
//! Commands for troubleshooting and debugging.

use crate::adapters::gemini::api_key_from_env;
use crate::adapters::{ClaudeCliClient, OllamaClient};
use crate::commands::output::print_one;
use crate::commands::settings::{log_dir, settings_path};
use crate::error::Result;
use crate::models::{Backend, Settings};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Diagnostic result with system checks
#[derive(Debug, Serialize)]
pub struct DiagnosticResult {
    pub settings_path: String,
    pub settings_file_exists: bool,
    pub backend: Backend,
    /// Whether the selected backend looks usable
    pub backend_ready: bool,
    pub backend_detail: String,
    /// Whether OpenAlex answered
    pub network: bool,
    pub log_path: Option<String>,
    pub app_version: String,
}

impl DiagnosticResult {
    fn render(&self) -> String {
        let yes_no = |b: bool| if b { "ok" } else { "FAILED" };
        format!(
            "litfinder {}\nsettings: {}{}\nbackend: {} ({}: {})\nnetwork: {}\nlogs: {}",
            self.app_version,
            self.settings_path,
            if self.settings_file_exists { "" } else { " (not created, using defaults)" },
            self.backend,
            yes_no(self.backend_ready),
            self.backend_detail,
            yes_no(self.network),
            self.log_path.as_deref().unwrap_or("unavailable"),
        )
    }
}

async fn check_backend(settings: &Settings) -> (bool, String) {
    match settings.backend {
        Backend::Gemini => {
            let has_key = settings
                .gemini_api_key
                .as_deref()
                .map(|k| !k.trim().is_empty())
                .unwrap_or(false)
                || api_key_from_env().is_some();
            if has_key {
                (true, format!("model {}, API key found", settings.gemini_model))
            } else {
                (false, "set GOOGLE_API_KEY or GEMINI_API_KEY".to_string())
            }
        }
        Backend::Ollama => {
            match OllamaClient::new(&settings.ollama_model, &settings.ollama_base_url, Duration::from_secs(5)) {
                Ok(client) if client.is_available().await => {
                    (true, format!("model {}, server reachable", settings.ollama_model))
                }
                Ok(_) => (false, format!("no Ollama server at {}", settings.ollama_base_url)),
                Err(e) => (false, e.to_string()),
            }
        }
        Backend::Claude => match ClaudeCliClient::get_version().await {
            Some(version) => (true, version),
            None => (false, "claude CLI not found on PATH".to_string()),
        },
    }
}

/// Check network connectivity
async fn check_network_connectivity() -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(c) => c,
        Err(_) => return false,
    };

    client
        .head("https://api.openalex.org")
        .send()
        .await
        .map(|r| r.status().is_success() || r.status().is_client_error())
        .unwrap_or(false)
}

/// Run diagnostic checks
pub async fn run_diagnostics(explicit: Option<&Path>, settings: &Settings, json: bool) -> Result<()> {
    info!("Running diagnostics");

    let path = settings_path(explicit)?;
    let (backend_ready, backend_detail) = check_backend(settings).await;
    let network = check_network_connectivity().await;

    let result = DiagnosticResult {
        settings_path: path.display().to_string(),
        settings_file_exists: path.exists(),
        backend: settings.backend,
        backend_ready,
        backend_detail,
        network,
        log_path: log_dir().map(|d| d.display().to_string()),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    print_one(json, result, DiagnosticResult::render)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let result = DiagnosticResult {
            settings_path: "/tmp/settings.json".to_string(),
            settings_file_exists: false,
            backend: Backend::Claude,
            backend_ready: false,
            backend_detail: "claude CLI not found on PATH".to_string(),
            network: true,
            log_path: None,
            app_version: "0.1.0".to_string(),
        };
        let text = result.render();
        assert!(text.contains("settings: /tmp/settings.json (not created, using defaults)"));
        assert!(text.contains("backend: claude (FAILED: claude CLI not found on PATH)"));
        assert!(text.contains("network: ok"));
        assert!(text.contains("logs: unavailable"));
    }
}
