//! Data models for NewsAPI payloads and the headline batches built from them.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SearchResponse`] / [`ApiArticle`]: the raw `/v2/everything` payload, every field optional
//! - [`Article`]: a validated headline with all required fields present
//! - [`Category`] / [`CategoryBatch`]: a capped, ordered list of headlines for one feed section
//!
//! The API models use camelCase field names to match the NewsAPI JSON schema,
//! hence the `#[allow(non_snake_case)]` attributes.

use serde::{Deserialize, Serialize};

/// Top-level body returned by the NewsAPI search endpoint.
///
/// Successful responses carry `status: "ok"` and an `articles` array. Error
/// responses carry `status: "error"` together with `code` and `message`.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    /// `"ok"` or `"error"`.
    pub status: String,
    /// Total matches reported by the API (not the number returned).
    #[serde(default)]
    pub totalResults: Option<u64>,
    /// The returned articles, newest first when `sortBy=publishedAt`.
    #[serde(default)]
    pub articles: Vec<ApiArticle>,
    /// Machine-readable error code on failure (e.g. `apiKeyInvalid`).
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable error message on failure.
    #[serde(default)]
    pub message: Option<String>,
}

impl SearchResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// A single article exactly as the API returned it.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiArticle {
    #[serde(default)]
    pub source: Option<ApiSource>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub publishedAt: Option<String>,
}

/// The publisher block nested inside each API article.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A validated headline.
///
/// Every field except `description` is guaranteed non-empty. Equality and
/// hashing cover the whole record, so two articles are duplicates only
/// when every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Article {
    pub title: String,
    /// Canonical link; doubles as the item guid in the feed.
    pub url: String,
    pub description: Option<String>,
    /// Publication time as sent by the API, `YYYY-MM-DDTHH:MM:SSZ`.
    pub published_at: String,
    pub source_name: String,
}

impl Article {
    /// Promote an API record to an [`Article`].
    ///
    /// Returns `None` when title, url, publishedAt, or source name is
    /// missing or blank.
    pub fn from_api(raw: ApiArticle) -> Option<Self> {
        let source_name = raw.source.and_then(|s| s.name).and_then(non_blank)?;
        Some(Self {
            title: raw.title.and_then(non_blank)?,
            url: raw.url.and_then(non_blank)?,
            description: raw.description,
            published_at: raw.publishedAt.and_then(non_blank)?,
            source_name,
        })
    }
}

fn non_blank(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

/// Which section of the feed a batch belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    Global,
    /// Regional focus of the day, e.g. `"South America"`.
    Regional(String),
    /// Topical focus of the day, e.g. `"Technology"`.
    Topical(String),
}

impl Category {
    /// The label used in logs and as the phrase-table key.
    pub fn label(&self) -> &str {
        match self {
            Category::Global => "Global",
            Category::Regional(region) => region.as_str(),
            Category::Topical(topic) => topic.as_str(),
        }
    }

    /// The value of the `<category>` element, absent for global items.
    pub fn feed_category(&self) -> Option<&str> {
        match self {
            Category::Global => None,
            Category::Regional(label) | Category::Topical(label) => Some(label.as_str()),
        }
    }
}

/// The filtered, deduplicated, size-capped headlines for one category.
#[derive(Debug, Clone)]
pub struct CategoryBatch {
    pub category: Category,
    /// The page size this batch was capped at.
    pub max_size: usize,
    pub articles: Vec<Article>,
}

impl CategoryBatch {
    #[cfg(test)]
    pub fn empty(category: Category, max_size: usize) -> Self {
        Self {
            category,
            max_size,
            articles: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}
