//! `litfinder lookup` and the interactive prompt
//!
//! Query in, one abstract fetched, cleaned, token-limited and summarized.

use crate::adapters::language_model;
use crate::commands::output::print_one;
use crate::error::{LitError, Result};
use crate::models::{LookupRecord, Settings};
use crate::services::{FetchService, SummarizerService, SummaryOptions, NO_ABSTRACT};
use std::io::{self, BufRead, Write};
use tracing::info;

fn render(record: &LookupRecord, show_abstract: bool) -> String {
    let mut out = String::new();
    if let Some(title) = &record.title {
        out.push_str(title);
        out.push('\n');
    }
    if show_abstract {
        out.push_str(&format!("\nAbstract:\n{}\n\nSummary:\n", record.cleaned_text));
    }
    out.push_str(&record.summary_text);
    out
}

/// Fetch and summarize the abstract `query` points at
pub async fn lookup(query: &str, settings: &Settings) -> Result<LookupRecord> {
    let fetcher = FetchService::new(settings)?;
    let mut record = fetcher.fetch_abstract(query, &settings.sources).await?;

    record.summary_text = if record.cleaned_text.trim().is_empty() {
        NO_ABSTRACT.to_string()
    } else {
        let summarizer =
            SummarizerService::new(language_model(settings)?, SummaryOptions::from(settings));
        info!("Summarizing \"{}\" with {}", record.query, summarizer.backend_name());
        summarizer.summarize_abstract(&record.cleaned_text).await?
    };

    Ok(record)
}

pub async fn run_lookup(query: &str, show_abstract: bool, settings: &Settings, json: bool) -> Result<()> {
    if query.trim().is_empty() {
        return Err(LitError::Config("empty query".to_string()));
    }
    let record = lookup(query, settings).await?;
    print_one(json, record, |r| render(r, show_abstract))
}

/// Read one query line from `input`, prompting on `prompt`
pub fn read_query<R: BufRead, W: Write>(mut input: R, mut prompt: W) -> Result<String> {
    write!(prompt, "Enter a paper title, DOI or arXiv ID: ")?;
    prompt.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// No command given: ask for a query on stdin and look it up
pub async fn run_interactive(settings: &Settings, json: bool) -> Result<()> {
    let query = read_query(io::stdin().lock(), io::stderr())?;
    run_lookup(&query, true, settings, json).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_query() {
        let mut prompt = Vec::new();
        let query = read_query("  quantum robots \nignored\n".as_bytes(), &mut prompt).unwrap();
        assert_eq!(query, "quantum robots");
        assert!(String::from_utf8(prompt).unwrap().starts_with("Enter a paper"));
    }

    #[test]
    fn test_render() {
        let record = LookupRecord {
            query: "q".to_string(),
            title: Some("Swarms".to_string()),
            cleaned_text: "Long abstract.".to_string(),
            summary_text: "Short.".to_string(),
            ..LookupRecord::default()
        };
        assert_eq!(render(&record, false), "Swarms\nShort.");
        assert_eq!(
            render(&record, true),
            "Swarms\n\nAbstract:\nLong abstract.\n\nSummary:\nShort."
        );
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let err = run_lookup("  ", false, &Settings::default(), false).await.unwrap_err();
        assert!(matches!(err, LitError::Config(_)));
    }
}
