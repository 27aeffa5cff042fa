//! OpenAlex API client
//!
//! Cursor-paginated work search plus single-work lookup by DOI.
//! See: https://docs.openalex.org/

use crate::error::{LitError, Result};
use crate::models::{Paper, Source};
use crate::utils::http::{build_client, get_json, rate_limiters, Fetched, RetryConfig};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const API_BASE: &str = "https://api.openalex.org/works";

/// OpenAlex caps `per_page` at 200
const MAX_PER_PAGE: usize = 200;

const SELECT_FIELDS: &str =
    "title,authorships,publication_year,abstract_inverted_index,primary_location,doi";

#[derive(Debug, Deserialize)]
struct WorksPage {
    #[serde(default)]
    meta: Option<PageMeta>,
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Work {
    title: Option<String>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    publication_year: Option<i32>,
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
    primary_location: Option<Location>,
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    author: Option<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    source: Option<LocationSource>,
}

#[derive(Debug, Deserialize)]
struct LocationSource {
    display_name: Option<String>,
}

impl From<Work> for Paper {
    fn from(work: Work) -> Self {
        let mut paper = Paper::new(work.title.unwrap_or_default(), Source::OpenAlex);
        paper.authors = work
            .authorships
            .into_iter()
            .filter_map(|a| a.author.and_then(|author| author.display_name))
            .filter(|name| !name.trim().is_empty())
            .collect();
        paper.year = work.publication_year;
        paper.r#abstract = work
            .abstract_inverted_index
            .as_ref()
            .map(reconstruct_abstract)
            .unwrap_or_default();
        paper.journal = work
            .primary_location
            .and_then(|loc| loc.source)
            .and_then(|src| src.display_name)
            .filter(|name| !name.is_empty());
        paper.doi = work.doi.filter(|doi| !doi.is_empty());
        paper
    }
}

/// Rebuild abstract text from OpenAlex's `{word: [positions]}` encoding
///
/// Every word is placed at each of its positions; gaps are skipped. Cost
/// follows the number of entries, not the largest position.
pub fn reconstruct_abstract(index: &HashMap<String, Vec<usize>>) -> String {
    let mut placed: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |&pos| (pos, word.as_str())))
        .collect();
    placed.sort_unstable();
    // Two words claiming one position: keep the first after sorting
    placed.dedup_by_key(|(pos, _)| *pos);

    placed
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Client for the OpenAlex API
pub struct OpenAlexClient {
    client: Client,
    base: String,
    mailto: Option<String>,
    retry: RetryConfig,
}

impl OpenAlexClient {
    /// Create a new OpenAlex client
    ///
    /// # Arguments
    /// * `mailto` - Contact email; routes requests to the polite pool
    /// * `timeout` - Per-request timeout
    pub fn new(mailto: Option<String>, timeout: Duration) -> Result<Self> {
        let client = build_client(timeout, mailto.as_deref())?;
        Ok(Self::with_client(client, mailto))
    }

    /// Create a new client with an existing reqwest client
    pub fn with_client(client: Client, mailto: Option<String>) -> Self {
        Self {
            client,
            base: API_BASE.to_string(),
            mailto,
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff: Duration::from_millis(500),
                max_backoff: Duration::from_secs(10),
                multiplier: 2.0,
            },
        }
    }

    /// Point the client at another `/works` endpoint
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn mailto_param(&self) -> String {
        self.mailto
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .map(|m| format!("&mailto={}", urlencoding::encode(m.trim())))
            .unwrap_or_default()
    }

    fn search_url(&self, query: &str, per_page: usize, cursor: &str) -> String {
        format!(
            "{}?search={}&per_page={}&cursor={}&select={}{}",
            self.base,
            urlencoding::encode(query),
            per_page,
            urlencoding::encode(cursor),
            SELECT_FIELDS,
            self.mailto_param()
        )
    }

    async fn fetch_page(&self, query: &str, per_page: usize, cursor: &str) -> Result<Fetched<WorksPage>> {
        rate_limiters::OPENALEX.wait_for_slot("openalex").await;

        let url = self.search_url(query, per_page, cursor);
        debug!("OpenAlex search page (cursor {}): {}", cursor, query);

        get_json(
            &self.client,
            &url,
            &self.retry,
            &format!("OpenAlex search for {}", query),
        )
        .await
    }

    /// First page of results only, with the response body
    pub async fn search_page(&self, query: &str, max_results: usize) -> Result<Fetched<Vec<Paper>>> {
        let per_page = max_results.clamp(1, MAX_PER_PAGE);
        let page = self.fetch_page(query, per_page, "*").await?;
        Ok(page.map(|p| p.results.into_iter().take(max_results).map(Paper::from).collect()))
    }

    /// Search works, following the cursor until `max_results` or exhaustion
    ///
    /// A failure on a later page keeps what was already fetched.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        let per_page = max_results.clamp(1, MAX_PER_PAGE);
        let mut cursor = "*".to_string();
        let mut papers: Vec<Paper> = Vec::new();

        while papers.len() < max_results {
            let page = match self.fetch_page(query, per_page, &cursor).await {
                Ok(fetched) => fetched.value,
                Err(e) if papers.is_empty() => return Err(e),
                Err(e) => {
                    warn!("OpenAlex pagination stopped after {} results: {}", papers.len(), e);
                    break;
                }
            };

            if page.results.is_empty() {
                break;
            }

            let remaining = max_results - papers.len();
            papers.extend(page.results.into_iter().take(remaining).map(Paper::from));

            match page.meta.and_then(|m| m.next_cursor) {
                Some(next) if !next.is_empty() => cursor = next,
                _ => break,
            }
        }

        debug!("OpenAlex returned {} papers for {}", papers.len(), query);
        Ok(papers)
    }

    /// Look up a single work by DOI
    pub async fn find_by_doi(&self, doi: &str) -> Result<Fetched<Paper>> {
        rate_limiters::OPENALEX.wait_for_slot("openalex").await;

        let url = format!(
            "{}/doi:{}?select={}{}",
            self.base,
            urlencoding::encode(doi).replace("%2F", "/"),
            SELECT_FIELDS,
            self.mailto_param()
        );

        debug!("OpenAlex DOI lookup: {}", doi);

        match get_json::<Work>(&self.client, &url, &self.retry, &format!("OpenAlex lookup for {}", doi))
            .await
        {
            Ok(work) => Ok(work.map(Paper::from)),
            Err(LitError::Status { code: 404, .. }) => Err(LitError::NoAbstract(doi.to_string())),
            Err(e) => Err(e),
        }
    }
}
