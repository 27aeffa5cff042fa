//! `litfinder search`
//!
//! Fetch, deduplicate, clean, then summarize/tag a preview of the results.

use crate::adapters::{language_model, FileSystemAdapter};
use crate::cli::SearchArgs;
use crate::commands::output::{print_one, print_out};
use crate::error::Result;
use crate::models::{Paper, SearchOutcome, Settings};
use crate::services::cleaning::{clean_html_abstract, normalize_authors, remove_duplicates};
use crate::services::{FetchService, KeywordService, SummarizerService, SummaryOptions};
use chrono::Utc;
use tracing::info;

/// Key phrases per paper
const KEYWORDS_PER_PAPER: usize = 5;

/// Settings with the command's flags applied on top
pub fn effective_settings(args: &SearchArgs, base: &Settings) -> Settings {
    let mut settings = base.clone();
    if let Some(max) = args.max_results {
        settings.max_results = max;
    }
    if !args.sources.is_empty() {
        settings.sources = args.sources.clone();
    }
    if let Some(words) = args.max_words {
        settings.max_words = words;
    }
    if let Some(preview) = args.preview {
        settings.preview = preview;
    }
    settings.max_results = settings.max_results.max(1);
    settings
}

/// Clean abstracts in place and optionally flip author names
pub fn prepare_papers(papers: Vec<Paper>, flip_authors: bool) -> Vec<Paper> {
    let mut papers = remove_duplicates(papers);
    for paper in &mut papers {
        paper.r#abstract = clean_html_abstract(&paper.r#abstract);
        paper.title = clean_html_abstract(&paper.title);
        if flip_authors {
            paper.authors = paper
                .authors
                .iter()
                .map(|name| normalize_authors(name))
                .filter(|name| !name.is_empty())
                .collect();
        }
    }
    papers
}

/// Indices that get summaries/keywords: a preview, or everything
pub fn selected_indices(len: usize, preview: usize, all: bool) -> Vec<usize> {
    let count = if all { len } else { preview.min(len) };
    (0..count).collect()
}

fn render_paper(index: usize, paper: &Paper) -> String {
    let mut out = format!("[{}] {}", index + 1, if paper.title.is_empty() { "(untitled)" } else { paper.title.as_str() });
    if let Some(year) = paper.year {
        out.push_str(&format!(" ({})", year));
    }
    out.push_str(&format!(" [{}]", paper.source));
    if !paper.authors.is_empty() {
        out.push_str(&format!("\n    Authors: {}", paper.authors_str()));
    }
    if let Some(journal) = &paper.journal {
        out.push_str(&format!("\n    Journal: {}", journal));
    }
    if let Some(doi) = &paper.doi {
        out.push_str(&format!("\n    DOI: {}", doi));
    }
    if let Some(summary) = &paper.summary {
        out.push_str(&format!("\n    Summary: {}", summary));
    }
    if !paper.keywords.is_empty() {
        out.push_str(&format!("\n    Keywords: {}", paper.keywords.join(", ")));
    }
    out
}

pub async fn run_search(args: &SearchArgs, base: &Settings, json: bool) -> Result<()> {
    let settings = effective_settings(args, base);
    let query = args.query.trim();

    let fetcher = FetchService::new(&settings)?;
    let fetched = fetcher
        .fetch_all(query, settings.max_results, &settings.sources)
        .await?;

    let mut papers = prepare_papers(fetched.papers, args.normalize_authors);
    let indices = selected_indices(papers.len(), settings.preview, args.all);

    if !args.no_summarize && !indices.is_empty() {
        let summarizer = SummarizerService::new(
            language_model(&settings)?,
            SummaryOptions::from(&settings),
        );
        summarizer.run_summaries(&mut papers, &indices).await;
    }

    if args.keywords && !indices.is_empty() {
        let keywords = KeywordService::new(language_model(&settings)?);
        keywords
            .extract_keywords(&mut papers, &indices, KEYWORDS_PER_PAPER)
            .await;
    }

    if let Some(path) = &args.csv {
        FileSystemAdapter::new().export_csv(path, &papers)?;
    }

    let outcome = SearchOutcome {
        query: query.to_string(),
        processed: indices.len(),
        fetched_per_source: fetched.per_source,
        papers,
        finished_at: Utc::now(),
    };

    info!(
        "Done: {} papers, {} processed",
        outcome.papers.len(),
        outcome.processed
    );

    if json {
        return print_one(true, &outcome, |_| String::new());
    }

    let rows: Vec<(usize, &Paper)> = outcome.papers.iter().enumerate().collect();
    print_out(false, &rows, |(i, paper)| render_paper(*i, paper))?;

    eprintln!(
        "{} papers found; {}",
        outcome.papers.len(),
        if args.all {
            "processed all of them.".to_string()
        } else {
            format!("processed a preview of {}.", outcome.processed)
        }
    );
    if !args.all && outcome.papers.len() > outcome.processed && !args.no_summarize {
        eprintln!("Re-run with --all to summarize every result.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;

    #[test]
    fn test_effective_settings() {
        let args = SearchArgs {
            query: "q".to_string(),
            max_results: Some(0),
            sources: vec![Source::Arxiv],
            max_words: Some(30),
            ..SearchArgs::default()
        };
        let settings = effective_settings(&args, &Settings::default());
        assert_eq!(settings.max_results, 1);
        assert_eq!(settings.sources, vec![Source::Arxiv]);
        assert_eq!(settings.max_words, 30);
        assert_eq!(settings.preview, Settings::default().preview);
    }

    #[test]
    fn test_selected_indices() {
        assert_eq!(selected_indices(50, 20, false).len(), 20);
        assert_eq!(selected_indices(5, 20, false), vec![0, 1, 2, 3, 4]);
        assert_eq!(selected_indices(50, 20, true).len(), 50);
        assert!(selected_indices(0, 20, true).is_empty());
    }

    #[test]
    fn test_prepare_papers() {
        let mut a = Paper::new("Robots <i>learn</i>".to_string(), Source::Crossref);
        a.r#abstract = "<jats:p>Robots   learn.</jats:p>".to_string();
        a.authors = vec!["Lovelace Ada".to_string()];
        a.doi = Some("10.1/a".to_string());
        let mut dup = a.clone();
        dup.source = Source::OpenAlex;
        dup.doi = Some("https://doi.org/10.1/A".to_string());

        let papers = prepare_papers(vec![a, dup], true);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Robots learn");
        assert_eq!(papers[0].r#abstract, "Robots learn.");
        assert_eq!(papers[0].authors, vec!["Ada Lovelace".to_string()]);
    }

    #[test]
    fn test_render_paper() {
        let mut paper = Paper::new("Swarms".to_string(), Source::Arxiv);
        paper.year = Some(2023);
        paper.summary = Some("Swarms work.".to_string());
        let text = render_paper(0, &paper);
        assert!(text.starts_with("[1] Swarms (2023) [arxiv]"));
        assert!(text.contains("\n    Summary: Swarms work."));
        assert!(!text.contains("DOI"));
    }
}
