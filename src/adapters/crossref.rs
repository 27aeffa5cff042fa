//! Crossref REST API client
//!
//! See: https://api.crossref.org/swagger-ui/index.html

use crate::error::{LitError, Result};
use crate::models::{Paper, Source};
use crate::utils::http::{build_client, get_json, rate_limiters, Fetched, RetryConfig};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://api.crossref.org/works";

/// Crossref caps `rows` at 1000
const MAX_ROWS: usize = 1000;

const SELECT_FIELDS: &str = "title,author,issued,abstract,container-title,DOI";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    message: SearchMessage,
}

#[derive(Debug, Deserialize)]
struct SearchMessage {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct WorkResponse {
    message: Item,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<ItemAuthor>,
    issued: Option<Issued>,
    #[serde(rename = "abstract")]
    abstract_markup: Option<String>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemAuthor {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Issued {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl ItemAuthor {
    fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.given.as_deref(), self.family.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            // Organisations carry a single `name`
            self.name.clone().filter(|n| !n.trim().is_empty())
        } else {
            Some(parts.join(" "))
        }
    }
}

impl From<Item> for Paper {
    fn from(item: Item) -> Self {
        let title = item.title.into_iter().next().unwrap_or_default();
        let mut paper = Paper::new(title, Source::Crossref);
        paper.authors = item.author.iter().filter_map(ItemAuthor::full_name).collect();
        paper.year = item
            .issued
            .and_then(|issued| issued.date_parts.into_iter().next())
            .and_then(|parts| parts.into_iter().next().flatten());
        // JATS markup is left for the cleaning pass
        paper.r#abstract = item.abstract_markup.unwrap_or_default();
        paper.journal = item
            .container_title
            .into_iter()
            .next()
            .filter(|j| !j.is_empty());
        paper.doi = item.doi.filter(|doi| !doi.is_empty());
        paper
    }
}

/// Client for the Crossref API
pub struct CrossrefClient {
    client: Client,
    base: String,
    mailto: Option<String>,
    retry: RetryConfig,
}

impl CrossrefClient {
    /// Create a new Crossref client
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

    fn search_url(&self, query: &str, rows: usize) -> String {
        format!(
            "{}?query={}&rows={}&select={}{}",
            self.base,
            urlencoding::encode(query),
            rows,
            SELECT_FIELDS,
            self.mailto_param()
        )
    }

    /// Search works, keeping the response body
    ///
    /// Crossref returns up to `min(1000, max_results)` in one page.
    pub async fn search_page(&self, query: &str, max_results: usize) -> Result<Fetched<Vec<Paper>>> {
        rate_limiters::CROSSREF.wait_for_slot("crossref").await;

        let rows = max_results.clamp(1, MAX_ROWS);
        let url = self.search_url(query, rows);

        debug!("Crossref search: {}", query);

        let data: Fetched<SearchResponse> = get_json(
            &self.client,
            &url,
            &self.retry,
            &format!("Crossref search for {}", query),
        )
        .await?;

        let fetched = data.map(|resp| {
            resp.message
                .items
                .into_iter()
                .take(max_results)
                .map(Paper::from)
                .collect::<Vec<_>>()
        });

        debug!("Crossref returned {} papers for {}", fetched.value.len(), query);
        Ok(fetched)
    }

    /// Search works
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        Ok(self.search_page(query, max_results).await?.value)
    }

    /// Look up a single work by DOI
    pub async fn find_by_doi(&self, doi: &str) -> Result<Fetched<Paper>> {
        rate_limiters::CROSSREF.wait_for_slot("crossref").await;

        let mailto = self.mailto_param();
        let url = format!(
            "{}/{}{}",
            self.base,
            urlencoding::encode(doi).replace("%2F", "/"),
            mailto.replacen('&', "?", 1)
        );

        debug!("Crossref DOI lookup: {}", doi);

        match get_json::<WorkResponse>(
            &self.client,
            &url,
            &self.retry,
            &format!("Crossref lookup for {}", doi),
        )
        .await
        {
            Ok(resp) => Ok(resp.map(|r| Paper::from(r.message))),
            Err(LitError::Status { code: 404, .. }) => Err(LitError::NoAbstract(doi.to_string())),
            Err(e) => Err(e),
        }
    }
}
