//! Services module for business logic
//!
//! Services coordinate the adapters: fetching from metadata sources,
//! cleaning abstracts, and summarizing or tagging them with a backend.

pub mod cleaning;
pub mod fetch_service;
pub mod keyword_service;
pub mod summarizer_service;

pub use fetch_service::{FetchResult, FetchService, LookupTarget};
pub use keyword_service::KeywordService;
pub use summarizer_service::{SummarizerService, SummaryOptions, NO_ABSTRACT};
