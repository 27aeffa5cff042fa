use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Metadata source a paper was fetched from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[value(name = "openalex")]
    OpenAlex,
    Crossref,
    Arxiv,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::OpenAlex => "openalex",
            Source::Crossref => "crossref",
            Source::Arxiv => "arxiv",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openalex" => Ok(Source::OpenAlex),
            "crossref" => Ok(Source::Crossref),
            "arxiv" => Ok(Source::Arxiv),
            other => Err(format!("unknown source: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paper {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub r#abstract: String,
    pub journal: Option<String>,
    pub doi: Option<String>,
    pub source: Source,

    pub summary: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Paper {
    pub fn new(title: String, source: Source) -> Self {
        Self {
            title,
            authors: Vec::new(),
            year: None,
            r#abstract: String::new(),
            journal: None,
            doi: None,
            source,
            summary: None,
            keywords: Vec::new(),
        }
    }

    pub fn authors_str(&self) -> String {
        self.authors.join(", ")
    }

    pub fn has_abstract(&self) -> bool {
        !self.r#abstract.trim().is_empty()
    }
}

/// One pass of the lookup flow: query in, summary out
///
/// `cleaned_text` is always derived from `abstract_text` by the cleaning
/// service; `summary_text` is whatever the backend returned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupRecord {
    pub query: String,
    pub title: Option<String>,
    /// Upstream body the abstract came from (JSON or Atom XML)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub raw_response: String,
    pub abstract_text: String,
    pub cleaned_text: String,
    pub summary_text: String,
}

/// Everything a `search` run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub query: String,
    pub papers: Vec<Paper>,
    /// How many papers went through summarization/keywords
    pub processed: usize,
    pub fetched_per_source: BTreeMap<Source, usize>,
    #[serde(default = "Utc::now")]
    pub finished_at: DateTime<Utc>,
}
