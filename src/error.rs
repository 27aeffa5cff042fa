//! Crate-wide error type

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LitError>;

#[derive(Debug, Error)]
pub enum LitError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("status: {code} {body}")]
    Status { code: u16, body: String },

    #[error("parse failed: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0} is not set")]
    MissingApiKey(&'static str),

    #[error("{backend} backend error: {message}")]
    Backend { backend: String, message: String },

    #[error("no data returned from any source")]
    NoResults,

    #[error("no abstract found for {0}")]
    NoAbstract(String),
}

impl LitError {
    /// Network failures, rate limiting and server errors are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            LitError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            LitError::Status { code, .. } => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }

    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        LitError::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for LitError {
    fn from(err: serde_json::Error) -> Self {
        LitError::Parse(err.to_string())
    }
}

impl From<csv::Error> for LitError {
    fn from(err: csv::Error) -> Self {
        LitError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_retryable() {
        let too_many = LitError::Status { code: 429, body: String::new() };
        let unavailable = LitError::Status { code: 503, body: String::new() };
        let not_found = LitError::Status { code: 404, body: String::new() };

        assert!(too_many.is_retryable());
        assert!(unavailable.is_retryable());
        assert!(!not_found.is_retryable());
        assert!(!LitError::NoResults.is_retryable());
        assert!(!LitError::Parse("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = LitError::backend("gemini", "quota exceeded");
        assert_eq!(err.to_string(), "gemini backend error: quota exceeded");
        assert_eq!(
            LitError::MissingApiKey("GOOGLE_API_KEY").to_string(),
            "GOOGLE_API_KEY is not set"
        );
    }
}
