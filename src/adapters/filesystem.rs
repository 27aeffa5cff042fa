//! Filesystem adapter
//!
//! Handles CSV export of search results and reading input text.

use crate::error::Result;
use crate::models::Paper;
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// One CSV row, in the column order bibliometrix/Biblioshiny imports expect
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    title: &'a str,
    authors: String,
    year: Option<i32>,
    #[serde(rename = "abstract")]
    abstract_text: &'a str,
    summary: &'a str,
    keywords: String,
    journal: &'a str,
    doi: &'a str,
    source: &'a str,
}

impl<'a> From<&'a Paper> for ExportRow<'a> {
    fn from(paper: &'a Paper) -> Self {
        Self {
            title: &paper.title,
            authors: paper.authors_str(),
            year: paper.year,
            abstract_text: &paper.r#abstract,
            summary: paper.summary.as_deref().unwrap_or(""),
            keywords: paper.keywords.join(", "),
            journal: paper.journal.as_deref().unwrap_or(""),
            doi: paper.doi.as_deref().unwrap_or(""),
            source: paper.source.as_str(),
        }
    }
}

/// Adapter for filesystem operations
#[derive(Debug, Clone, Default)]
pub struct FileSystemAdapter;

impl FileSystemAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Write papers as CSV to any writer
    pub fn write_csv<W: Write>(&self, writer: W, papers: &[Paper]) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for paper in papers {
            csv_writer.serialize(ExportRow::from(paper))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Export papers to a CSV file, creating parent directories
    pub fn export_csv(&self, path: &Path, papers: &[Paper]) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(path)?;
        self.write_csv(io::BufWriter::new(file), papers)?;
        info!("Exported {} papers to {}", papers.len(), path.display());
        Ok(())
    }

    /// Read input text from a file, or stdin when no path is given
    pub fn read_input(&self, path: Option<&Path>) -> Result<String> {
        match path {
            Some(path) => {
                debug!("Reading input from {}", path.display());
                Ok(fs::read_to_string(path)?)
            }
            None => {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                Ok(buf)
            }
        }
    }
}
