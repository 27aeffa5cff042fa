//! Fetch service
//!
//! Queries the metadata sources concurrently, unifies their records and
//! resolves single-abstract lookups.

use crate::adapters::{ArxivClient, CrossrefClient, OpenAlexClient};
use crate::error::{LitError, Result};
use crate::models::{LookupRecord, Paper, Settings, Source};
use crate::services::cleaning::{clean_html_abstract, normalize_doi};
use crate::utils::http::Fetched;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Candidates considered when a free-text lookup needs one abstract
const LOOKUP_CANDIDATES: usize = 5;

static DOI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(10\.\d{4,9}/\S+)").expect("valid DOI regex"));

static ARXIV_QUERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:arxiv:\s*|https?://arxiv\.org/(?:abs|pdf)/)?(\d{4}\.\d{4,5}(?:v\d+)?|[a-z-]+(?:\.[a-z]{2})?/\d{7}(?:v\d+)?)(?:\.pdf)?$")
        .expect("valid arXiv query regex")
});

/// What a lookup query refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupTarget {
    Doi(String),
    Arxiv(String),
    Text(String),
}

impl LookupTarget {
    /// Classify a user query as a DOI, an arXiv ID or free text
    pub fn parse(query: &str) -> Self {
        let query = query.trim();

        if let Some(cap) = ARXIV_QUERY.captures(query) {
            return LookupTarget::Arxiv(cap[1].to_string());
        }

        if let Some(cap) = DOI_PATTERN.captures(query) {
            let doi = normalize_doi(cap[1].trim_end_matches(['.', ',', ';']));
            // arXiv registers its own DOIs; the preprint API has the abstract
            if let Some(rest) = doi.strip_prefix("10.48550/arxiv.") {
                return LookupTarget::Arxiv(rest.to_string());
            }
            return LookupTarget::Doi(doi);
        }

        LookupTarget::Text(query.to_string())
    }
}

/// Papers from all sources plus how many each source contributed
#[derive(Debug, Default)]
pub struct FetchResult {
    pub papers: Vec<Paper>,
    pub per_source: BTreeMap<Source, usize>,
}

/// Service fanning out to the metadata sources
pub struct FetchService {
    openalex: OpenAlexClient,
    crossref: CrossrefClient,
    arxiv: ArxivClient,
}

impl FetchService {
    /// Build the source clients from settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        Ok(Self {
            openalex: OpenAlexClient::new(settings.mailto.clone(), timeout)?,
            crossref: CrossrefClient::new(settings.mailto.clone(), timeout)?,
            arxiv: ArxivClient::new(timeout)?,
        })
    }

    /// Build from ready-made clients
    pub fn with_clients(openalex: OpenAlexClient, crossref: CrossrefClient, arxiv: ArxivClient) -> Self {
        Self {
            openalex,
            crossref,
            arxiv,
        }
    }

    async fn fetch_source(&self, source: Source, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        match source {
            Source::OpenAlex => self.openalex.search(query, max_results).await,
            Source::Crossref => self.crossref.search(query, max_results).await,
            Source::Arxiv => self.arxiv.search(query, max_results).await,
        }
    }

    /// Fetch from every selected source concurrently
    ///
    /// A failing source is logged and skipped. Fails with `NoResults` only
    /// when no source returned anything.
    pub async fn fetch_all(
        &self,
        query: &str,
        max_results: usize,
        sources: &[Source],
    ) -> Result<FetchResult> {
        let mut unique: Vec<Source> = Vec::with_capacity(sources.len());
        for source in sources {
            if !unique.contains(source) {
                unique.push(*source);
            }
        }

        info!("Fetching \"{}\" from {} source(s)", query, unique.len());

        let outcomes = join_all(
            unique
                .iter()
                .map(|source| self.fetch_source(*source, query, max_results)),
        )
        .await;

        let mut result = FetchResult::default();
        for (source, outcome) in unique.into_iter().zip(outcomes) {
            match outcome {
                Ok(papers) => {
                    info!("{} returned {} papers", source, papers.len());
                    result.per_source.insert(source, papers.len());
                    result.papers.extend(papers);
                }
                Err(e) => warn!("{} fetch failed: {}", source, e),
            }
        }

        if result.papers.is_empty() {
            return Err(LitError::NoResults);
        }
        Ok(result)
    }

    async fn lookup_doi(&self, doi: &str) -> Result<Fetched<Paper>> {
        let mut fallback: Option<Fetched<Paper>> = None;

        for source in [Source::Crossref, Source::OpenAlex] {
            let outcome = match source {
                Source::Crossref => self.crossref.find_by_doi(doi).await,
                _ => self.openalex.find_by_doi(doi).await,
            };
            match outcome {
                Ok(fetched) if fetched.value.has_abstract() => return Ok(fetched),
                Ok(fetched) => {
                    debug!("{} has {} but no abstract", source, doi);
                    fallback.get_or_insert(fetched);
                }
                Err(e) => debug!("{} lookup for {} failed: {}", source, doi, e),
            }
        }

        fallback.ok_or_else(|| LitError::NoAbstract(doi.to_string()))
    }

    async fn search_page(&self, source: Source, text: &str) -> Result<Fetched<Vec<Paper>>> {
        match source {
            Source::OpenAlex => self.openalex.search_page(text, LOOKUP_CANDIDATES).await,
            Source::Crossref => self.crossref.search_page(text, LOOKUP_CANDIDATES).await,
            Source::Arxiv => self.arxiv.search_page(text, LOOKUP_CANDIDATES).await,
        }
    }

    /// First hit with an abstract, trying the sources in order
    async fn lookup_text(&self, text: &str, sources: &[Source]) -> Result<Fetched<Paper>> {
        let mut tried: Vec<Source> = Vec::with_capacity(sources.len());

        for &source in sources {
            if tried.contains(&source) {
                continue;
            }
            tried.push(source);

            match self.search_page(source, text).await {
                Ok(page) => {
                    let Fetched { value: papers, body } = page;
                    if let Some(paper) = papers.into_iter().find(Paper::has_abstract) {
                        return Ok(Fetched { value: paper, body });
                    }
                    debug!("{} has no abstract among its top hits for {}", source, text);
                }
                Err(e) => warn!("{} lookup failed: {}", source, e),
            }
        }

        Err(LitError::NoAbstract(text.to_string()))
    }

    /// Resolve one query to one paper with an abstract
    ///
    /// DOIs go to Crossref then OpenAlex, arXiv IDs to arXiv, and free text
    /// takes the first search hit that carries an abstract. `raw_response` is
    /// the upstream body the abstract was read from.
    pub async fn fetch_abstract(&self, query: &str, sources: &[Source]) -> Result<LookupRecord> {
        let target = LookupTarget::parse(query);
        debug!("Lookup target: {:?}", target);

        let Fetched { value: paper, body } = match &target {
            LookupTarget::Doi(doi) => self.lookup_doi(doi).await?,
            LookupTarget::Arxiv(id) => self.arxiv.find_by_id(id).await?,
            LookupTarget::Text(text) => self.lookup_text(text, sources).await?,
        };

        if !paper.has_abstract() {
            return Err(LitError::NoAbstract(query.trim().to_string()));
        }

        Ok(LookupRecord {
            query: query.trim().to_string(),
            title: Some(paper.title.clone()).filter(|t| !t.is_empty()),
            raw_response: body,
            cleaned_text: clean_html_abstract(&paper.r#abstract),
            abstract_text: paper.r#abstract,
            summary_text: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_lookup_target_doi() {
        assert_eq!(
            LookupTarget::parse("10.1000/XYZ.123"),
            LookupTarget::Doi("10.1000/xyz.123".to_string())
        );
        assert_eq!(
            LookupTarget::parse("https://doi.org/10.1038/nature12373."),
            LookupTarget::Doi("10.1038/nature12373".to_string())
        );
    }

    #[test]
    fn test_lookup_target_arxiv() {
        assert_eq!(
            LookupTarget::parse("2301.12345"),
            LookupTarget::Arxiv("2301.12345".to_string())
        );
        assert_eq!(
            LookupTarget::parse("arXiv:2301.12345v2"),
            LookupTarget::Arxiv("2301.12345v2".to_string())
        );
        assert_eq!(
            LookupTarget::parse("https://arxiv.org/pdf/hep-th/9901001.pdf"),
            LookupTarget::Arxiv("hep-th/9901001".to_string())
        );
        assert_eq!(
            LookupTarget::parse("10.48550/arXiv.2301.12345"),
            LookupTarget::Arxiv("2301.12345".to_string())
        );
    }

    #[test]
    fn test_lookup_target_text() {
        assert_eq!(
            LookupTarget::parse("  quantum cryptography robotics "),
            LookupTarget::Text("quantum cryptography robotics".to_string())
        );
        // A year range is not an arXiv ID
        assert_eq!(
            LookupTarget::parse("robotics 2019.2020 survey"),
            LookupTarget::Text("robotics 2019.2020 survey".to_string())
        );
    }

    const OPENALEX_PAGE: &str = r#"{
        "meta": {"next_cursor": null},
        "results": [
            {"title": "Quantum robots", "abstract_inverted_index": {"Robots": [0], "learn": [1]}, "doi": "https://doi.org/10.1000/qr"}
        ]
    }"#;

    const CROSSREF_PAGE: &str = r#"{
        "message": {
            "items": [
                {"title": ["No abstract here"], "DOI": "10.1000/none"},
                {"title": ["Swarm robotics"], "abstract": "<jats:p>Swarms   adapt &amp; <jats:italic>learn</jats:italic> .</jats:p>", "DOI": "10.1000/swarm"}
            ]
        }
    }"#;

    fn service(server: &MockServer) -> FetchService {
        let uri = server.uri();
        FetchService::with_clients(
            OpenAlexClient::with_client(Client::new(), None).with_base(format!("{}/openalex/works", uri)),
            CrossrefClient::with_client(Client::new(), None).with_base(format!("{}/crossref/works", uri)),
            ArxivClient::with_client(Client::new()).with_base(format!("{}/arxiv/query", uri)),
        )
    }

    async fn mount(server: &MockServer, route: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fetch_all_skips_failing_source() {
        let server = MockServer::start().await;
        mount(&server, "/openalex/works", 200, OPENALEX_PAGE).await;
        mount(&server, "/crossref/works", 400, "bad request").await;

        let result = service(&server)
            .fetch_all("quantum robots", 10, &[Source::OpenAlex, Source::Crossref, Source::OpenAlex])
            .await
            .unwrap();

        assert_eq!(result.papers.len(), 1);
        assert_eq!(result.papers[0].source, Source::OpenAlex);
        assert_eq!(result.per_source.get(&Source::OpenAlex), Some(&1));
        assert!(!result.per_source.contains_key(&Source::Crossref));
    }

    #[tokio::test]
    async fn test_fetch_all_every_source_failing_is_no_results() {
        let server = MockServer::start().await;
        mount(&server, "/openalex/works", 400, "").await;
        mount(&server, "/crossref/works", 403, "").await;

        let err = service(&server)
            .fetch_all("quantum robots", 10, &[Source::OpenAlex, Source::Crossref])
            .await
            .unwrap_err();
        assert!(matches!(err, LitError::NoResults));
    }

    #[tokio::test]
    async fn test_fetch_abstract_text_lookup() {
        let server = MockServer::start().await;
        mount(&server, "/openalex/works", 400, "").await;
        mount(&server, "/crossref/works", 200, CROSSREF_PAGE).await;

        let record = service(&server)
            .fetch_abstract("  swarm robotics ", &[Source::OpenAlex, Source::Crossref])
            .await
            .unwrap();

        assert_eq!(record.query, "swarm robotics");
        assert_eq!(record.title.as_deref(), Some("Swarm robotics"));
        assert!(record.abstract_text.starts_with("<jats:p>Swarms"));
        assert_eq!(record.cleaned_text, clean_html_abstract(&record.abstract_text));
        assert_eq!(record.cleaned_text, "Swarms adapt & learn.");
        assert_eq!(record.raw_response, CROSSREF_PAGE);
        assert!(record.summary_text.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_abstract_doi_falls_back_to_openalex() {
        let server = MockServer::start().await;
        let work = r#"{"title": "Quantum robots", "abstract_inverted_index": {"Robots": [0], "learn": [1]}}"#;
        mount(&server, "/openalex/works/doi:10.1000/qr", 200, work).await;

        let record = service(&server)
            .fetch_abstract("https://doi.org/10.1000/QR", &[])
            .await
            .unwrap();

        assert_eq!(record.cleaned_text, "Robots learn");
        assert_eq!(record.raw_response, work);
    }

    #[tokio::test]
    async fn test_fetch_abstract_nothing_found() {
        let server = MockServer::start().await;
        mount(&server, "/crossref/works", 200, r#"{"message": {"items": []}}"#).await;

        let err = service(&server)
            .fetch_abstract("swarm robotics", &[Source::Crossref])
            .await
            .unwrap_err();
        assert!(matches!(err, LitError::NoAbstract(_)));
    }
}
