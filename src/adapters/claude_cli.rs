//! Claude CLI wrapper
//!
//! Runs the `claude` command-line tool in print mode as a text generator.

use super::LanguageModel;
use crate::error::{LitError, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

const PROGRAM: &str = "claude";

/// Claude CLI client for LLM-powered operations
#[derive(Debug, Clone, Default)]
pub struct ClaudeCliClient;

impl ClaudeCliClient {
    /// Create a new Claude CLI client
    pub fn new() -> Self {
        Self
    }

    /// Get Claude CLI version
    pub async fn get_version() -> Option<String> {
        Command::new(PROGRAM)
            .arg("--version")
            .output()
            .await
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
    }
}

#[async_trait]
impl LanguageModel for ClaudeCliClient {
    fn name(&self) -> &str {
        "claude"
    }

    /// The CLI has no output token limit flag; the prompt asks for brevity instead
    async fn generate(&self, prompt: &str, _max_output_tokens: u32) -> Result<String> {
        debug!("Claude CLI request ({} chars)", prompt.len());

        let output = Command::new(PROGRAM)
            .args(["--print", "-p", prompt])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| LitError::backend("claude", format!("failed to run Claude CLI: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Claude CLI exited with {}", output.status);
            return Err(LitError::backend("claude", stderr.trim().to_string()));
        }

        let response = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if response.is_empty() {
            return Err(LitError::backend("claude", "empty response"));
        }
        Ok(response)
    }
}
