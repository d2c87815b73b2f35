//! NewsAPI search client.
//!
//! # Architecture
//!
//! - [`NewsSearch`]: the seam the fetcher talks to, one call per search phrase
//! - [`NewsApiClient`]: the HTTP implementation against `/v2/everything`
//!
//! Each call is a single attempt bounded by the client's timeout. Callers
//! decide what to do with failures; the fetcher logs them and moves on.

use crate::config::ApiConfig;
use crate::models::SearchResponse;
use crate::utils::truncate_for_log;
use std::error::Error;
use std::time::{Duration as StdDuration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

/// Parameters of one headline search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub phrase: String,
    /// Maximum number of articles to return (`pageSize`).
    pub page_size: usize,
    /// Earliest publication date, `YYYY-MM-DD` (`from`).
    pub from: String,
}

/// Trait for headline search backends.
///
/// Implementors run one search and return the decoded response body, or an
/// error for network, HTTP status, or decoding failures.
pub trait NewsSearch {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, Box<dyn Error>>;
}

/// HTTP client for the NewsAPI `everything` endpoint.
pub struct NewsApiClient {
    http: reqwest::Client,
    endpoint: String,
    language: String,
    api_key: String,
}

impl std::fmt::Debug for NewsApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsApiClient")
            .field("endpoint", &self.endpoint)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl NewsApiClient {
    /// Build a client with the configured endpoint, language, and timeout.
    pub fn new(config: &ApiConfig, api_key: String) -> Result<Self, Box<dyn Error>> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            language: config.language.clone(),
            api_key,
        })
    }

    /// The full request URL for a query, API key included.
    pub fn request_url(&self, query: &SearchQuery) -> Result<Url, Box<dyn Error>> {
        let page_size = query.page_size.to_string();
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("q", query.phrase.as_str()),
                ("language", self.language.as_str()),
                ("pageSize", page_size.as_str()),
                ("apiKey", self.api_key.as_str()),
                ("from", query.from.as_str()),
                ("sortBy", "publishedAt"),
            ],
        )?;
        Ok(url)
    }
}

impl NewsSearch for NewsApiClient {
    #[instrument(level = "info", skip_all, fields(phrase = %query.phrase))]
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, Box<dyn Error>> {
        let t0 = Instant::now();
        let url = self.request_url(query)?;

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let dt = t0.elapsed();

        if !status.is_success() {
            warn!(
                %status,
                elapsed_ms = dt.as_millis(),
                body = %truncate_for_log(&body, 300),
                "NewsAPI returned an error status"
            );
            return Err(format!("NewsAPI responded with HTTP {status}").into());
        }

        let parsed: SearchResponse = serde_json::from_str(&body)?;
        debug!(
            elapsed_ms = dt.as_millis(),
            returned = parsed.articles.len(),
            total = ?parsed.totalResults,
            "NewsAPI search complete"
        );
        Ok(parsed)
    }
}
