//! HTTP utilities with retry logic and rate limiting
//!
//! Provides exponential backoff, sliding-window rate limiting and a few
//! request helpers shared by the metadata and summarization adapters.

use crate::error::{LitError, Result};
use reqwest::{Client, Response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Longest error body kept in `LitError::Status`
const MAX_ERROR_BODY: usize = 800;

/// Rate limiter for API endpoints
pub struct RateLimiter {
    /// Window size
    window: Duration,
    /// Maximum requests per window
    max_requests: u32,
    /// Request timestamps per endpoint
    requests: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl RateLimiter {
    /// Create a new rate limiter allowing `max_requests` per `window`
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            requests: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if a request can be made and record it
    ///
    /// # Returns
    /// * `true` if request is allowed
    /// * `false` if rate limit exceeded
    pub async fn check_and_record(&self, endpoint: &str) -> bool {
        let mut requests = self.requests.lock().await;
        let now = Instant::now();

        let timestamps = requests.entry(endpoint.to_string()).or_default();

        // Remove timestamps outside the window
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests as usize {
            debug!(
                "Rate limit hit for {}: {} requests in {:?}",
                endpoint,
                timestamps.len(),
                self.window
            );
            return false;
        }

        timestamps.push(now);
        true
    }

    /// Wait until a request can be made
    pub async fn wait_for_slot(&self, endpoint: &str) {
        loop {
            if self.check_and_record(endpoint).await {
                return;
            }
            let wait = self
                .time_until_slot(endpoint)
                .await
                .unwrap_or(Duration::from_millis(100))
                .max(Duration::from_millis(10));
            tokio::time::sleep(wait).await;
        }
    }

    /// Time until the next slot frees up, or `None` if one is available now
    pub async fn time_until_slot(&self, endpoint: &str) -> Option<Duration> {
        let requests = self.requests.lock().await;
        let now = Instant::now();

        let timestamps = requests.get(endpoint)?;
        let live: Vec<&Instant> = timestamps
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .collect();

        if live.len() < self.max_requests as usize {
            return None;
        }

        live.iter()
            .min()
            .map(|oldest| self.window.saturating_sub(now.duration_since(**oldest)))
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries
    pub max_retries: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier (exponential factor)
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff before the retry following `attempt` (0-indexed)
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_ms =
            self.initial_backoff.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let backoff = Duration::from_millis(backoff_ms as u64);
        backoff.min(self.max_backoff)
    }
}

/// Execute an async operation with exponential backoff retry
///
/// `should_retry` decides whether a given error is worth another attempt;
/// non-retryable errors and the error of the final attempt are returned as is.
pub async fn with_retry<T, E, F, Fut, R>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: R,
) -> std::result::Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt + 1);
                }
                return Ok(result);
            }
            Err(e) if attempt < config.max_retries && should_retry(&e) => {
                let backoff = config.backoff_for_attempt(attempt);
                warn!(
                    "{} failed (attempt {}): {}. Retrying in {:?}",
                    operation_name,
                    attempt + 1,
                    e,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Build a client with the crate's user agent and the given timeout
pub fn build_client(timeout: Duration, mailto: Option<&str>) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .user_agent(user_agent(mailto))
        .build()
        .map_err(LitError::from)
}

/// User agent; OpenAlex and Crossref route requests with a mailto to their polite pool
pub fn user_agent(mailto: Option<&str>) -> String {
    match mailto.filter(|m| !m.trim().is_empty()) {
        Some(mail) => format!(
            "LitFinder/{} (+mailto:{})",
            env!("CARGO_PKG_VERSION"),
            mail.trim()
        ),
        None => format!("LitFinder/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Turn a non-success response into `LitError::Status`, keeping a bounded body
pub async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(LitError::Status {
        code: status.as_u16(),
        body: truncate_body(body.trim()),
    })
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// A decoded response together with the body it was decoded from
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub body: String,
}

impl<T> Fetched<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            value: f(self.value),
            body: self.body,
        }
    }
}

/// Decode a JSON body, keeping the body
pub fn decode_json<T: serde::de::DeserializeOwned>(body: String) -> Result<Fetched<T>> {
    let value = serde_json::from_str(&body)?;
    Ok(Fetched { value, body })
}

/// GET a URL and decode JSON, retrying transient failures
pub async fn get_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    config: &RetryConfig,
    operation_name: &str,
) -> Result<Fetched<T>> {
    let body = get_text(client, url, config, operation_name).await?;
    decode_json(body)
}

/// GET a URL and return the body text, retrying transient failures
pub async fn get_text(
    client: &Client,
    url: &str,
    config: &RetryConfig,
    operation_name: &str,
) -> Result<String> {
    with_retry(
        config,
        operation_name,
        || {
            let client = client.clone();
            let url = url.to_string();
            async move {
                let resp = client.get(&url).send().await?;
                let resp = check_status(resp).await?;
                Ok(resp.text().await?)
            }
        },
        LitError::is_retryable,
    )
    .await
}

/// Default rate limiters for the APIs we talk to
pub mod rate_limiters {
    use super::RateLimiter;
    use once_cell::sync::Lazy;
    use std::time::Duration;

    /// OpenAlex: 10 requests per second
    pub static OPENALEX: Lazy<RateLimiter> =
        Lazy::new(|| RateLimiter::new(Duration::from_secs(1), 10));

    /// Crossref: polite pool allows more, stay at 10 per second
    pub static CROSSREF: Lazy<RateLimiter> =
        Lazy::new(|| RateLimiter::new(Duration::from_secs(1), 10));

    /// arXiv: asks for 1 request per 3 seconds
    pub static ARXIV: Lazy<RateLimiter> =
        Lazy::new(|| RateLimiter::new(Duration::from_secs(3), 1));

    /// Gemini free tier: 15 requests per minute
    pub static GEMINI: Lazy<RateLimiter> =
        Lazy::new(|| RateLimiter::new(Duration::from_secs(60), 15));
}
