//! Offline text commands plus `summarize` on local input

use crate::adapters::{language_model, FileSystemAdapter};
use crate::commands::output::print_one;
use crate::error::Result;
use crate::models::{LookupRecord, Settings};
use crate::services::cleaning::clean_html_abstract;
use crate::services::{SummarizerService, SummaryOptions, NO_ABSTRACT};
use crate::utils::tokens::{count_tokens, truncate_tokens};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct TokenReport {
    pub tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<String>,
}

pub fn token_report(text: &str, max: Option<usize>) -> TokenReport {
    TokenReport {
        tokens: count_tokens(text),
        truncated: max.map(|m| truncate_tokens(text, m)),
    }
}

pub fn run_clean(file: Option<&Path>, json: bool) -> Result<()> {
    let text = FileSystemAdapter::new().read_input(file)?;
    print_one(json, clean_html_abstract(&text), |s| s.clone())
}

pub fn run_tokens(file: Option<&Path>, max: Option<usize>, json: bool) -> Result<()> {
    let text = FileSystemAdapter::new().read_input(file)?;
    let report = token_report(&text, max);
    print_one(json, report, |r| match &r.truncated {
        Some(truncated) => format!("{}\n{}", r.tokens, truncated),
        None => r.tokens.to_string(),
    })
}

pub async fn run_summarize(file: Option<&Path>, settings: &Settings, json: bool) -> Result<()> {
    let raw = FileSystemAdapter::new().read_input(file)?;
    let cleaned = clean_html_abstract(&raw);

    // No backend needed (or configured) for empty input
    let summary = if cleaned.is_empty() {
        NO_ABSTRACT.to_string()
    } else {
        let summarizer =
            SummarizerService::new(language_model(settings)?, SummaryOptions::from(settings));
        summarizer.summarize_abstract(&cleaned).await?
    };

    let record = LookupRecord {
        query: file.map(|p| p.display().to_string()).unwrap_or_else(|| "-".to_string()),
        title: None,
        raw_response: String::new(),
        abstract_text: raw,
        cleaned_text: cleaned,
        summary_text: summary,
    };
    print_one(json, record, |r| r.summary_text.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_report() {
        let report = token_report("a b  c d", Some(2));
        assert_eq!(report.tokens, 4);
        assert_eq!(report.truncated.as_deref(), Some("a b"));

        let json = serde_json::to_value(token_report("a b", None)).unwrap();
        assert_eq!(json, serde_json::json!({"tokens": 2}));
    }
}
