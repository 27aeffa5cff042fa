//! Abstract cleaning, author normalization and deduplication

use crate::models::Paper;
use once_cell::sync::Lazy;
use html2text::render::text_renderer::TrivialDecorator;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Titles more similar than this are treated as the same paper
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.95;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]*>").expect("valid tag regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Decode HTML entities (named and numeric) in tag-free text
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    // Wider than the input so the renderer never wraps or splits a word
    let width = text.len().max(80);
    html2text::from_read_with_decorator(text.as_bytes(), width, TrivialDecorator::new())
}

/// Strip markup from an abstract and collapse its whitespace
///
/// Tags are removed, HTML entities decoded and every whitespace run
/// (including the newlines JATS markup leaves behind) becomes a single space.
pub fn clean_html_abstract(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    // Tags become spaces so "<p>a</p><p>b</p>" doesn't glue words together
    let without_tags = TAG.replace_all(text, " ");

    let decoded = decode_entities(&without_tags);

    let collapsed = WHITESPACE.replace_all(&decoded, " ");
    tidy_punctuation(collapsed.trim())
}

/// Remove the space a stripped tag leaves before closing punctuation
fn tidy_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' {
            if let Some(next) = chars.peek() {
                if matches!(next, ',' | '.' | ';' | ':' | ')' | '?' | '!') {
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Flip "Family Given" author names to "Given Family"
///
/// `"Doe John, Smith Jane"` becomes `"John Doe, Jane Smith"`. Empty names
/// are dropped.
pub fn normalize_authors(names: &str) -> String {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            let mut words: Vec<&str> = name.split_whitespace().collect();
            words.reverse();
            words.join(" ")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Canonical DOI: lowercase, without resolver prefix
pub fn normalize_doi(doi: &str) -> String {
    let doi = doi.trim().to_lowercase();
    for prefix in ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/", "doi:"] {
        if let Some(rest) = doi.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    doi
}

fn normalized_title(paper: &Paper) -> String {
    paper.title.trim().to_lowercase()
}

/// Drop duplicate papers, keeping the first occurrence
///
/// Papers with a DOI are compared by DOI only. Papers without one are
/// dropped when their title is nearly identical to a paper already kept.
pub fn remove_duplicates(papers: Vec<Paper>) -> Vec<Paper> {
    let before = papers.len();
    let mut seen_dois: HashSet<String> = HashSet::new();
    let mut kept: Vec<Paper> = Vec::with_capacity(papers.len());
    let mut kept_titles: Vec<String> = Vec::with_capacity(papers.len());

    for paper in papers {
        let title = normalized_title(&paper);
        let doi = paper
            .doi
            .as_deref()
            .map(normalize_doi)
            .filter(|d| !d.is_empty());

        match doi {
            Some(doi) => {
                if !seen_dois.insert(doi) {
                    continue;
                }
            }
            None => {
                let duplicate = !title.is_empty()
                    && kept_titles.iter().any(|existing| {
                        !existing.is_empty()
                            && strsim::normalized_levenshtein(existing, &title)
                                > TITLE_SIMILARITY_THRESHOLD
                    });
                if duplicate {
                    continue;
                }
            }
        }

        kept_titles.push(title);
        kept.push(paper);
    }

    debug!("Deduplicated {} papers down to {}", before, kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;

    fn paper(title: &str, doi: Option<&str>) -> Paper {
        let mut p = Paper::new(title.to_string(), Source::Crossref);
        p.doi = doi.map(str::to_string);
        p
    }

    #[test]
    fn test_clean_removes_tags_and_collapses_whitespace() {
        let raw = "<jats:p>Quantum   key\n distribution <i>works</i>.</jats:p>";
        assert_eq!(clean_html_abstract(raw), "Quantum key distribution works.");
    }

    #[test]
    fn test_clean_separates_block_elements() {
        let raw = "<jats:title>Abstract</jats:title><jats:p>First.</jats:p><jats:p>Second.</jats:p>";
        assert_eq!(clean_html_abstract(raw), "Abstract First. Second.");
    }

    #[test]
    fn test_clean_decodes_entities() {
        assert_eq!(
            clean_html_abstract("R&amp;D &lt;fast&gt; &quot;robots&quot; &#233;t&#xE9;"),
            "R&D <fast> \"robots\" été"
        );
        assert_eq!(clean_html_abstract("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_clean_decodes_typographic_entities() {
        assert_eq!(
            clean_html_abstract("Robots &mdash; swarms &ndash; noise &hellip; &copy; 2020 &alpha;-decay"),
            "Robots \u{2014} swarms \u{2013} noise \u{2026} \u{a9} 2020 \u{3b1}-decay"
        );
        assert_eq!(
            clean_html_abstract("<jats:p>Spin&nbsp;&frac12; in H&#8322;O</jats:p>"),
            "Spin \u{bd} in H\u{2082}O"
        );
    }

    #[test]
    fn test_clean_empty_input() {
        assert_eq!(clean_html_abstract(""), "");
        assert_eq!(clean_html_abstract(" \n\t "), "");
        assert_eq!(clean_html_abstract("<p></p>"), "");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let once = clean_html_abstract("<p>Robots  <b>learn</b> , fast.</p>");
        assert_eq!(once, "Robots learn, fast.");
        assert_eq!(clean_html_abstract(&once), once);
    }

    #[test]
    fn test_normalize_authors() {
        assert_eq!(normalize_authors("Doe John, Smith Jane"), "John Doe, Jane Smith");
        assert_eq!(normalize_authors("Curie, , Bohr Niels "), "Curie, Niels Bohr");
        assert_eq!(normalize_authors(""), "");
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(normalize_doi("https://doi.org/10.1000/ABC"), "10.1000/abc");
        assert_eq!(normalize_doi("doi:10.1000/x"), "10.1000/x");
        assert_eq!(normalize_doi(" 10.1000/y "), "10.1000/y");
    }

    #[test]
    fn test_remove_duplicates_by_doi() {
        let papers = vec![
            paper("First", Some("10.1/a")),
            paper("First (OpenAlex copy)", Some("https://doi.org/10.1/A")),
            paper("Second", Some("10.1/b")),
        ];
        let kept = remove_duplicates(papers);
        let titles: Vec<_> = kept.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[test]
    fn test_remove_duplicates_by_fuzzy_title() {
        let papers = vec![
            paper("Quantum cryptography for swarm robotics", Some("10.1/a")),
            paper("Quantum Cryptography for Swarm Robotics ", None),
            paper("Quantum cryptography for swarm robotic", None),
            paper("Something else entirely", None),
            paper("", None),
            paper("", None),
        ];
        let kept = remove_duplicates(papers);
        let titles: Vec<_> = kept.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Quantum cryptography for swarm robotics", "Something else entirely", "", ""]
        );
    }
}
