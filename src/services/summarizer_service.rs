//! Summarizer service
//!
//! Token-limits abstracts, asks the configured backend for a short summary
//! and tidies what comes back. The backend itself is a black box.

use crate::adapters::LanguageModel;
use crate::error::Result;
use crate::models::{Paper, Settings};
use crate::utils::tokens::{count_tokens, output_budget, truncate_tokens};
use tracing::{debug, info, warn};

/// Returned instead of calling the backend for an empty abstract
pub const NO_ABSTRACT: &str = "No abstract provided.";

/// Length limits for a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOptions {
    pub max_words: usize,
    pub min_words: usize,
    /// Abstracts are cut to this many tokens before the call
    pub max_input_tokens: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            max_words: 60,
            min_words: 15,
            max_input_tokens: 1024,
        }
    }
}

impl From<&Settings> for SummaryOptions {
    fn from(settings: &Settings) -> Self {
        let max_words = settings.max_words.max(1);
        Self {
            max_words,
            min_words: settings.min_words.min(max_words),
            max_input_tokens: settings.max_input_tokens.max(1),
        }
    }
}

impl SummaryOptions {
    /// Output budget: words become roughly 1.3 tokens, plus slack
    fn max_output_tokens(&self) -> u32 {
        output_budget(self.max_words, 2, 32)
    }
}

/// Summarizer service for backend-based summarization
pub struct SummarizerService {
    model: Box<dyn LanguageModel>,
    options: SummaryOptions,
}

impl SummarizerService {
    pub fn new(model: Box<dyn LanguageModel>, options: SummaryOptions) -> Self {
        Self { model, options }
    }

    pub fn backend_name(&self) -> &str {
        self.model.name()
    }

    /// Summarize one abstract
    ///
    /// Empty input short-circuits to [`NO_ABSTRACT`]; backend failures are
    /// returned to the caller.
    pub async fn summarize_abstract(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(NO_ABSTRACT.to_string());
        }

        let tokens = count_tokens(text);
        let input = truncate_tokens(text, self.options.max_input_tokens);
        if tokens > self.options.max_input_tokens {
            debug!(
                "Truncated abstract from {} to {} tokens",
                tokens, self.options.max_input_tokens
            );
        }

        let prompt = Self::build_prompt(&input, &self.options);
        let response = self
            .model
            .generate(&prompt, self.options.max_output_tokens())
            .await?;

        Ok(Self::tidy_summary(&response))
    }

    /// Summarize the papers at `indices`, in order
    ///
    /// A failure for one paper is recorded in its summary and the batch
    /// carries on. Returns how many summaries succeeded.
    pub async fn run_summaries(&self, papers: &mut [Paper], indices: &[usize]) -> usize {
        let total = indices.len();
        let mut succeeded = 0;

        info!("Summarizing {} abstracts with {}", total, self.model.name());

        for (done, &idx) in indices.iter().enumerate() {
            let Some(paper) = papers.get_mut(idx) else {
                continue;
            };

            debug!("Summarizing {}/{}: {}", done + 1, total, paper.title);

            match self.summarize_abstract(&paper.r#abstract).await {
                Ok(summary) => {
                    paper.summary = Some(summary);
                    succeeded += 1;
                }
                Err(e) => {
                    warn!("Summarization failed for \"{}\": {}", paper.title, e);
                    paper.summary = Some(format!("Error during summarization: {}", e));
                }
            }
        }

        succeeded
    }

    /// Build the summarization prompt
    fn build_prompt(text: &str, options: &SummaryOptions) -> String {
        format!(
            r#"Summarize the following academic abstract in one or two plain sentences of {} to {} words.
Keep the main finding and the method. Do not add information that is not in the abstract.
Respond with the summary only: no heading, no preamble, no quotes.

Abstract:
{}"#,
            options.min_words, options.max_words, text
        )
    }

    /// Strip the packaging models like to put around a summary
    fn tidy_summary(response: &str) -> String {
        let mut text = response.trim();

        for prefix in ["Summary:", "**Summary:**", "Summary -"] {
            if let Some(rest) = text.strip_prefix(prefix) {
                text = rest.trim_start();
            }
        }

        // Single quotes are left alone: they are as often inner quotes as wrappers
        for (open, close) in [('"', '"'), ('“', '”')] {
            if text.len() >= 2 && text.starts_with(open) && text.ends_with(close) {
                text = text[open.len_utf8()..text.len() - close.len_utf8()].trim();
            }
        }

        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
