//! Keyword extraction
//!
//! Asks the configured backend for a handful of key phrases per abstract and
//! parses its JSON reply.

use crate::adapters::LanguageModel;
use crate::models::Paper;
use crate::utils::tokens::{output_budget, truncate_chars};
use tracing::{debug, info, warn};

/// Abstract prefix sent for keyword extraction
const MAX_INPUT_CHARS: usize = 1000;

/// Keyword service backed by a language model
pub struct KeywordService {
    model: Box<dyn LanguageModel>,
}

impl KeywordService {
    pub fn new(model: Box<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Key phrases for one abstract; empty abstracts and failures give none
    pub async fn keywords_for(&self, text: &str, top_n: usize) -> Vec<String> {
        if text.trim().is_empty() || top_n == 0 {
            return Vec::new();
        }

        let prompt = Self::build_prompt(truncate_chars(text, MAX_INPUT_CHARS), top_n);
        match self.model.generate(&prompt, output_budget(top_n, 12, 32)).await {
            Ok(response) => parse_keywords(&response, top_n),
            Err(e) => {
                warn!("Keyword extraction failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Fill `keywords` for the papers at `indices`
    pub async fn extract_keywords(&self, papers: &mut [Paper], indices: &[usize], top_n: usize) {
        info!("Extracting keywords for {} abstracts with {}", indices.len(), self.model.name());

        for &idx in indices {
            let Some(paper) = papers.get_mut(idx) else {
                continue;
            };
            paper.keywords = self.keywords_for(&paper.r#abstract, top_n).await;
            debug!("Keywords for \"{}\": {:?}", paper.title, paper.keywords);
        }
    }

    fn build_prompt(text: &str, top_n: usize) -> String {
        format!(
            r#"Extract up to {} distinct key phrases (one or two words each) that best describe this academic abstract.
Prefer specific technical terms over generic words. Respond with ONLY a JSON array of strings, for example ["swarm robotics", "quantum cryptography"].

Abstract:
{}"#,
            top_n, text
        )
    }
}

/// Pull the first balanced JSON array or object out of a model reply
///
/// Handles bare JSON, JSON in a fenced code block and JSON surrounded by
/// prose.
pub fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    let start = trimmed.find(['[', '{'])?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in trimmed[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&trimmed[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a keyword reply into at most `top_n` unique phrases
///
/// Falls back to comma/line splitting when the reply is not a JSON array.
pub fn parse_keywords(response: &str, top_n: usize) -> Vec<String> {
    let candidates: Vec<String> = extract_json(response)
        .and_then(|json| serde_json::from_str::<Vec<String>>(json).ok())
        .unwrap_or_else(|| {
            response
                .split([',', '\n'])
                .map(|s| {
                    s.trim()
                        .trim_start_matches(['-', '*', '•'])
                        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
                        .to_string()
                })
                .collect()
        });

    let mut keywords: Vec<String> = Vec::new();
    for candidate in candidates {
        let phrase = candidate
            .trim()
            .trim_matches(['"', '\'', '`'])
            .trim()
            .to_lowercase();
        if phrase.is_empty() || phrase.starts_with("```") || keywords.contains(&phrase) {
            continue;
        }
        keywords.push(phrase);
        if keywords.len() == top_n {
            break;
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use crate::services::summarizer_service::tests::FakeModel;

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json(r#"["a", "b"]"#), Some(r#"["a", "b"]"#));
        assert_eq!(
            extract_json("Here you go:\n```json\n[\"a\", \"b]\"]\n```"),
            Some(r#"["a", "b]"]"#)
        );
        assert_eq!(extract_json(r#"{"k": [1, 2]} trailing"#), Some(r#"{"k": [1, 2]}"#));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("[unterminated"), None);
    }

    #[test]
    fn test_parse_keywords_json() {
        let reply = r#"```json
["Swarm Robotics", "quantum cryptography", "swarm robotics", "", "QKD"]
```"#;
        assert_eq!(
            parse_keywords(reply, 5),
            vec!["swarm robotics", "quantum cryptography", "qkd"]
        );
        assert_eq!(parse_keywords(reply, 1), vec!["swarm robotics"]);
    }

    #[test]
    fn test_parse_keywords_fallback() {
        let reply = "1. swarm robotics\n2. quantum links\n- noise";
        assert_eq!(
            parse_keywords(reply, 5),
            vec!["swarm robotics", "quantum links", "noise"]
        );
    }

    #[tokio::test]
    async fn test_extract_keywords_for_selected_papers() {
        let model = FakeModel::new(vec![Ok(r#"["robots", "swarms"]"#.to_string())]);
        let service = KeywordService::new(Box::new(model));

        let mut first = Paper::new("A".to_string(), Source::Arxiv);
        first.r#abstract = "Robots form swarms.".to_string();
        let empty = Paper::new("B".to_string(), Source::Arxiv);
        let mut papers = vec![first, empty];

        service.extract_keywords(&mut papers, &[0, 1], 5).await;
        assert_eq!(papers[0].keywords, vec!["robots", "swarms"]);
        assert!(papers[1].keywords.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_gives_no_keywords() {
        let service = KeywordService::new(Box::new(FakeModel::new(vec![])));
        assert!(service.keywords_for("Some abstract.", 5).await.is_empty());
    }
}
