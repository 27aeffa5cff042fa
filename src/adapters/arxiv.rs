//! arXiv API client
//!
//! Searches and looks up preprints through arXiv's Atom query API.
//! See: https://arxiv.org/help/api/

use crate::error::{LitError, Result};
use crate::models::{Paper, Source};
use crate::services::cleaning::clean_html_abstract;
use crate::utils::http::{build_client, get_text, rate_limiters, Fetched, RetryConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const API_BASE: &str = "https://export.arxiv.org/api/query";

/// arXiv asks clients to keep pages small
const MAX_PER_CALL: usize = 100;

static ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").expect("valid entry regex"));
static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").expect("valid title regex"));
static SUMMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").expect("valid summary regex"));
static AUTHOR_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").expect("valid author regex")
});
static PUBLISHED_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<published>(\d{4})").expect("valid published regex"));
static JOURNAL_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<arxiv:journal_ref[^>]*>(.*?)</arxiv:journal_ref>")
        .expect("valid journal_ref regex")
});
static DOI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<arxiv:doi[^>]*>(.*?)</arxiv:doi>").expect("valid doi regex")
});
static ABS_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<id>https?://arxiv\.org/abs/([^<]+)</id>").expect("valid id regex")
});
static NEW_STYLE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}\.\d{4,5}(?:v\d+)?)").expect("valid arXiv id regex"));
static OLD_STYLE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z-]+(?:\.[A-Z]{2})?/\d{7}(?:v\d+)?)").expect("valid arXiv id regex"));

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .map(|cap| clean_html_abstract(&cap[1]))
        .filter(|s| !s.is_empty())
}

/// Parse the `<entry>` elements of an arXiv Atom feed
pub fn parse_feed(xml: &str) -> Vec<Paper> {
    ENTRY
        .captures_iter(xml)
        .map(|entry| {
            let body = &entry[1];
            let mut paper = Paper::new(capture(&TITLE, body).unwrap_or_default(), Source::Arxiv);
            paper.authors = AUTHOR_NAME
                .captures_iter(body)
                .map(|cap| clean_html_abstract(&cap[1]))
                .filter(|name| !name.is_empty())
                .collect();
            paper.year = PUBLISHED_YEAR
                .captures(body)
                .and_then(|cap| cap[1].parse().ok());
            paper.r#abstract = SUMMARY
                .captures(body)
                .map(|cap| cap[1].trim().to_string())
                .unwrap_or_default();
            paper.journal = capture(&JOURNAL_REF, body);
            paper.doi = capture(&DOI, body);
            paper
        })
        .collect()
}

/// Client for the arXiv API
pub struct ArxivClient {
    client: Client,
    base: String,
    retry: RetryConfig,
}

impl ArxivClient {
    /// Create a new arXiv client
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = build_client(timeout, None)?;
        Ok(Self::with_client(client))
    }

    /// Create a new client with an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base: API_BASE.to_string(),
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff: Duration::from_secs(3), // arXiv asks for 3-second delays
                max_backoff: Duration::from_secs(30),
                multiplier: 2.0,
            },
        }
    }

    /// Point the client at another query endpoint
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Extract arXiv ID from a DOI or URL
    ///
    /// Handles formats like:
    /// - 2301.12345
    /// - arxiv:2301.12345
    /// - https://arxiv.org/abs/2301.12345
    /// - https://arxiv.org/pdf/2301.12345.pdf
    /// - 10.48550/arXiv.2301.12345 (DOI format)
    /// - hep-th/9901001 (old format)
    pub fn extract_arxiv_id(input: &str) -> Option<String> {
        if let Some(cap) = NEW_STYLE_ID.captures(input) {
            return Some(cap[1].to_string());
        }
        OLD_STYLE_ID.captures(input).map(|cap| cap[1].to_string())
    }

    fn search_url(&self, query: &str, start: usize, max_results: usize) -> String {
        format!(
            "{}?search_query=all:{}&start={}&max_results={}&sortBy=relevance",
            self.base,
            urlencoding::encode(query),
            start,
            max_results
        )
    }

    async fn fetch_feed(&self, url: &str, operation: &str) -> Result<String> {
        // arXiv asks for a 3-second gap between requests
        rate_limiters::ARXIV.wait_for_slot("arxiv").await;
        get_text(&self.client, url, &self.retry, operation).await
    }

    /// First page of results only, with the raw feed
    pub async fn search_page(&self, query: &str, max_results: usize) -> Result<Fetched<Vec<Paper>>> {
        let n = max_results.clamp(1, MAX_PER_CALL);
        let url = self.search_url(query, 0, n);

        debug!("arXiv search (first page): {}", query);

        let xml = self
            .fetch_feed(&url, &format!("arXiv search for {}", query))
            .await?;
        let papers = parse_feed(&xml).into_iter().take(n).collect();
        Ok(Fetched { value: papers, body: xml })
    }

    /// Search arXiv, paging `start` until `max_results` or an empty page
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        let mut papers: Vec<Paper> = Vec::new();
        let mut start = 0;

        while papers.len() < max_results {
            let n = MAX_PER_CALL.min(max_results - papers.len());
            let url = self.search_url(query, start, n);

            debug!("arXiv search (start {}): {}", start, query);

            let xml = match self
                .fetch_feed(&url, &format!("arXiv search for {}", query))
                .await
            {
                Ok(xml) => xml,
                Err(e) if papers.is_empty() => return Err(e),
                Err(e) => {
                    warn!("arXiv paging stopped after {} results: {}", papers.len(), e);
                    break;
                }
            };

            let page = parse_feed(&xml);
            if page.is_empty() {
                break;
            }
            papers.extend(page.into_iter().take(n));
            start += n;
        }

        debug!("arXiv returned {} papers for {}", papers.len(), query);
        Ok(papers)
    }

    /// Look up a single preprint by arXiv ID
    pub async fn find_by_id(&self, arxiv_id: &str) -> Result<Fetched<Paper>> {
        let clean_id = arxiv_id.trim();
        let url = format!("{}?id_list={}", self.base, urlencoding::encode(clean_id));

        debug!("arXiv lookup for ID: {}", clean_id);

        let xml = self
            .fetch_feed(&url, &format!("arXiv lookup for {}", clean_id))
            .await?;

        // Unknown IDs come back as an error entry without an abs link
        if !ABS_ID.is_match(&xml) {
            debug!("Paper not found on arXiv: {}", clean_id);
            return Err(LitError::NoAbstract(clean_id.to_string()));
        }

        let paper = parse_feed(&xml)
            .into_iter()
            .next()
            .ok_or_else(|| LitError::NoAbstract(clean_id.to_string()))?;
        Ok(Fetched { value: paper, body: xml })
    }
}
