//! Headline fetching and batch assembly.
//!
//! A batch is built from a short list of search phrases. Each phrase is
//! queried once, in order; the results are validated, filtered to the
//! recency window, merged, deduplicated on the full record, sorted newest
//! first, and capped at the batch size.
//!
//! Nothing in here fails: a phrase whose request errors out simply
//! contributes no articles.

use crate::api::{NewsSearch, SearchQuery};
use crate::config::{Config, QualitySources};
use crate::models::{ApiArticle, Article, Category, CategoryBatch};
use crate::utils::{parse_published_at, sanitize_text};
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

/// Per-batch fetch limits and filters.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Only the first `max_phrases` phrases are queried.
    pub max_phrases: usize,
    /// Articles published before `now - recency` are dropped.
    pub recency: Duration,
    /// Source allow-list, `None` when it does not apply to this batch.
    pub allow_list: Option<QualitySources>,
}

impl FetchOptions {
    /// Options for `category` derived from the configuration.
    ///
    /// The source allow-list only ever applies to the regional and topical
    /// batches, and only when enabled.
    pub fn for_category(config: &Config, category: &Category) -> Self {
        let allow_list = match category {
            Category::Global => None,
            Category::Regional(_) | Category::Topical(_) if config.quality_sources.enabled => {
                Some(config.quality_sources.clone())
            }
            _ => None,
        };
        Self {
            max_phrases: config.fetch.max_phrases,
            recency: Duration::hours(config.fetch.recency_hours),
            allow_list,
        }
    }
}

/// Fetch up to `batch_size` recent headlines for `category`.
///
/// # Arguments
///
/// * `search` - The search backend
/// * `category` - Which feed section this batch fills
/// * `phrases` - Candidate search phrases, most important first
/// * `batch_size` - Page size requested per phrase and cap on the result
/// * `options` - Phrase limit, recency window, and allow-list
/// * `now` - Reference time for the recency window
#[instrument(
    level = "info",
    skip_all,
    fields(category = %category.label(), batch_size = batch_size)
)]
pub async fn fetch_batch<S: NewsSearch>(
    search: &S,
    category: Category,
    phrases: &[String],
    batch_size: usize,
    options: &FetchOptions,
    now: DateTime<Utc>,
) -> CategoryBatch {
    let cutoff = now - options.recency;
    let from = (now - Duration::days(1)).format("%Y-%m-%d").to_string();

    let per_phrase: Vec<Vec<Article>> = stream::iter(phrases.iter().take(options.max_phrases))
        .then(|phrase| {
            let query = SearchQuery {
                phrase: phrase.clone(),
                page_size: batch_size,
                from: from.clone(),
            };
            async move {
                match search.search(&query).await {
                    Ok(response) if response.is_ok() => {
                        let returned = response.articles.len();
                        let admitted: Vec<Article> = response
                            .articles
                            .into_iter()
                            .filter_map(|raw| admit(raw, cutoff, options.allow_list.as_ref()))
                            .collect();
                        debug!(
                            phrase = %query.phrase,
                            returned,
                            admitted = admitted.len(),
                            "Phrase searched"
                        );
                        admitted
                    }
                    Ok(response) => {
                        warn!(
                            phrase = %query.phrase,
                            status = %response.status,
                            code = ?response.code,
                            message = ?response.message,
                            "NewsAPI reported an error; skipping phrase"
                        );
                        Vec::new()
                    }
                    Err(e) => {
                        warn!(phrase = %query.phrase, error = %e, "Search failed; skipping phrase");
                        Vec::new()
                    }
                }
            }
        })
        .collect()
        .await;

    let articles = merge_articles(per_phrase, batch_size);
    info!(count = articles.len(), "Built category batch");

    CategoryBatch {
        category,
        max_size: batch_size,
        articles,
    }
}

/// Validate one API record against the required fields, the recency
/// cutoff, and the optional source allow-list.
pub fn admit(
    raw: ApiArticle,
    cutoff: DateTime<Utc>,
    allow_list: Option<&QualitySources>,
) -> Option<Article> {
    let Some(article) = Article::from_api(raw) else {
        debug!("Dropping article with missing required fields");
        return None;
    };
    if sanitize_text(&article.title).is_empty() {
        debug!(url = %article.url, "Dropping article whose title is only markup");
        return None;
    }

    let Some(published) = parse_published_at(&article.published_at) else {
        debug!(
            url = %article.url,
            published_at = %article.published_at,
            "Dropping article with unparseable timestamp"
        );
        return None;
    };
    if published < cutoff {
        debug!(url = %article.url, %published, "Dropping stale article");
        return None;
    }

    if let Some(allow_list) = allow_list {
        if !allow_list.allows(&article.source_name) {
            debug!(
                url = %article.url,
                source = %article.source_name,
                "Dropping article from unlisted source"
            );
            return None;
        }
    }

    Some(article)
}

/// Merge per-phrase results: drop exact duplicates keeping the first
/// occurrence, sort newest first, cap at `batch_size`.
///
/// `publishedAt` strings share one fixed-width UTC format, so comparing
/// them as strings orders them chronologically.
pub fn merge_articles(per_phrase: Vec<Vec<Article>>, batch_size: usize) -> Vec<Article> {
    per_phrase
        .into_iter()
        .flatten()
        .unique()
        .sorted_by(|a, b| b.published_at.cmp(&a.published_at))
        .take(batch_size)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiSource, SearchResponse};
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::error::Error;
    use std::sync::Mutex;

    /// Canned search backend keyed by phrase; unknown phrases fail.
    struct StubSearch {
        responses: HashMap<String, SearchResponse>,
        calls: Mutex<Vec<SearchQuery>>,
    }

    impl StubSearch {
        fn new(responses: Vec<(&str, Vec<ApiArticle>)>) -> Self {
            Self {
                responses: responses
                    .into_iter()
                    .map(|(phrase, articles)| (phrase.to_string(), ok_response(articles)))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_response(mut self, phrase: &str, response: SearchResponse) -> Self {
            self.responses.insert(phrase.to_string(), response);
            self
        }

        fn phrases_called(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|q| q.phrase.clone())
                .collect()
        }
    }

    impl NewsSearch for StubSearch {
        async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, Box<dyn Error>> {
            self.calls.lock().unwrap().push(query.clone());
            match self.responses.get(&query.phrase) {
                Some(resp) => Ok(resp.clone()),
                None => Err("connection refused".into()),
            }
        }
    }

    fn ok_response(articles: Vec<ApiArticle>) -> SearchResponse {
        SearchResponse {
            status: "ok".to_string(),
            totalResults: Some(articles.len() as u64),
            articles,
            code: None,
            message: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn raw(url: &str, published_at: &str) -> ApiArticle {
        ApiArticle {
            source: Some(ApiSource {
                id: None,
                name: Some("Reuters".to_string()),
            }),
            title: Some(format!("Title for {url}")),
            url: Some(url.to_string()),
            description: Some("Description".to_string()),
            publishedAt: Some(published_at.to_string()),
        }
    }

    fn options() -> FetchOptions {
        FetchOptions {
            max_phrases: 2,
            recency: Duration::hours(24),
            allow_list: None,
        }
    }

    fn phrases(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_missing_required_fields_are_excluded() {
        let mut no_title = raw("https://a.example/1", "2024-03-15T10:00:00Z");
        no_title.title = None;
        let mut no_url = raw("https://a.example/2", "2024-03-15T10:00:00Z");
        no_url.url = None;
        let mut no_date = raw("https://a.example/3", "2024-03-15T10:00:00Z");
        no_date.publishedAt = None;
        let mut no_source = raw("https://a.example/4", "2024-03-15T10:00:00Z");
        no_source.source = None;
        let good = raw("https://a.example/5", "2024-03-15T10:00:00Z");

        let stub = StubSearch::new(vec![(
            "world",
            vec![no_title, no_url, no_date, no_source, good],
        )]);
        let batch = fetch_batch(
            &stub,
            Category::Global,
            &phrases(&["world"]),
            10,
            &options(),
            now(),
        )
        .await;

        assert_eq!(batch.len(), 1);
        for article in &batch.articles {
            assert!(!article.title.is_empty());
            assert!(!article.url.is_empty());
            assert!(!article.published_at.is_empty());
            assert!(!article.source_name.is_empty());
        }
    }

    #[tokio::test]
    async fn test_stale_and_unparseable_articles_are_excluded() {
        let stub = StubSearch::new(vec![(
            "world",
            vec![
                raw("https://a.example/fresh", "2024-03-15T11:59:59Z"),
                raw("https://a.example/edge", "2024-03-14T12:00:00Z"),
                raw("https://a.example/stale", "2024-03-14T11:59:59Z"),
                raw("https://a.example/old", "2023-12-01T00:00:00Z"),
                raw("https://a.example/bad", "15 March 2024"),
                raw("https://a.example/offset", "2024-03-15T10:00:00+00:00"),
            ],
        )]);
        let batch = fetch_batch(
            &stub,
            Category::Global,
            &phrases(&["world"]),
            10,
            &options(),
            now(),
        )
        .await;

        let urls: Vec<&str> = batch.articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example/fresh", "https://a.example/edge"]);
    }

    #[tokio::test]
    async fn test_identical_records_across_phrases_appear_once() {
        let shared = raw("https://a.example/shared", "2024-03-15T09:00:00Z");
        let stub = StubSearch::new(vec![
            ("europe", vec![shared.clone(), raw("https://a.example/e", "2024-03-15T08:00:00Z")]),
            ("eu", vec![shared, raw("https://a.example/u", "2024-03-15T07:00:00Z")]),
        ]);
        let batch = fetch_batch(
            &stub,
            Category::Regional("Europe".to_string()),
            &phrases(&["europe", "eu"]),
            5,
            &options(),
            now(),
        )
        .await;

        assert_eq!(batch.len(), 3);
        let shared_count = batch
            .articles
            .iter()
            .filter(|a| a.url == "https://a.example/shared")
            .count();
        assert_eq!(shared_count, 1);
    }

    #[tokio::test]
    async fn test_near_duplicates_are_kept() {
        let first = raw("https://a.example/story", "2024-03-15T09:00:00Z");
        let mut revised = first.clone();
        revised.description = Some("Updated description".to_string());
        let mut same_description = raw("https://b.example/other", "2024-03-15T08:00:00Z");
        same_description.description = first.description.clone();

        let stub = StubSearch::new(vec![
            ("one", vec![first]),
            ("two", vec![revised, same_description]),
        ]);
        let batch = fetch_batch(
            &stub,
            Category::Global,
            &phrases(&["one", "two"]),
            10,
            &options(),
            now(),
        )
        .await;
        assert_eq!(batch.len(), 3);
    }

    #[tokio::test]
    async fn test_sorted_newest_first_and_truncated() {
        let stub = StubSearch::new(vec![
            (
                "one",
                vec![
                    raw("https://a.example/1", "2024-03-15T01:00:00Z"),
                    raw("https://a.example/2", "2024-03-15T05:00:00Z"),
                ],
            ),
            (
                "two",
                vec![
                    raw("https://a.example/3", "2024-03-15T03:00:00Z"),
                    raw("https://a.example/4", "2024-03-15T11:00:00Z"),
                ],
            ),
        ]);
        let batch = fetch_batch(
            &stub,
            Category::Topical("Science".to_string()),
            &phrases(&["one", "two"]),
            3,
            &options(),
            now(),
        )
        .await;

        let urls: Vec<&str> = batch.articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.example/4", "https://a.example/2", "https://a.example/3"]
        );
        assert_eq!(batch.max_size, 3);
    }

    #[tokio::test]
    async fn test_only_first_two_phrases_are_queried() {
        let stub = StubSearch::new(vec![
            ("a", vec![]),
            ("b", vec![]),
            ("c", vec![raw("https://a.example/c", "2024-03-15T10:00:00Z")]),
        ]);
        let batch = fetch_batch(
            &stub,
            Category::Global,
            &phrases(&["a", "b", "c"]),
            5,
            &options(),
            now(),
        )
        .await;

        assert!(batch.is_empty());
        assert_eq!(stub.phrases_called(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_query_parameters() {
        let stub = StubSearch::new(vec![("asia", vec![])]);
        fetch_batch(
            &stub,
            Category::Regional("Asia".to_string()),
            &phrases(&["asia"]),
            5,
            &options(),
            now(),
        )
        .await;

        let calls = stub.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].page_size, 5);
        assert_eq!(calls[0].from, "2024-03-14");
    }

    #[tokio::test]
    async fn test_failed_phrase_does_not_abort_batch() {
        let stub = StubSearch::new(vec![(
            "works",
            vec![raw("https://a.example/ok", "2024-03-15T10:00:00Z")],
        )]);
        let batch = fetch_batch(
            &stub,
            Category::Global,
            &phrases(&["broken", "works"]),
            5,
            &options(),
            now(),
        )
        .await;

        assert_eq!(batch.len(), 1);
        assert_eq!(stub.phrases_called().len(), 2);
    }

    #[tokio::test]
    async fn test_api_error_status_yields_nothing() {
        let error = SearchResponse {
            status: "error".to_string(),
            totalResults: None,
            articles: vec![raw("https://a.example/ignored", "2024-03-15T10:00:00Z")],
            code: Some("rateLimited".to_string()),
            message: Some("Too many requests".to_string()),
        };
        let stub = StubSearch::new(vec![]).with_response("world", error);
        let batch = fetch_batch(
            &stub,
            Category::Global,
            &phrases(&["world"]),
            5,
            &options(),
            now(),
        )
        .await;
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_all_phrases_failing_yields_empty_batch() {
        let stub = StubSearch::new(vec![]);
        let batch = fetch_batch(
            &stub,
            Category::Topical("Health".to_string()),
            &phrases(&["x", "y"]),
            5,
            &options(),
            now(),
        )
        .await;
        assert!(batch.is_empty());
        assert_eq!(batch.category, Category::Topical("Health".to_string()));
    }

    #[test]
    fn test_allow_list_filters_sources() {
        let allow_list = QualitySources {
            enabled: true,
            names: vec!["Reuters".to_string()],
        };
        let cutoff = now() - Duration::hours(24);

        let listed = raw("https://a.example/1", "2024-03-15T10:00:00Z");
        assert!(admit(listed, cutoff, Some(&allow_list)).is_some());

        let mut unlisted = raw("https://a.example/2", "2024-03-15T10:00:00Z");
        unlisted.source = Some(ApiSource {
            id: None,
            name: Some("Random Blog".to_string()),
        });
        assert!(admit(unlisted.clone(), cutoff, Some(&allow_list)).is_none());
        assert!(admit(unlisted, cutoff, None).is_some());
    }

    #[test]
    fn test_markup_only_titles_are_excluded() {
        let cutoff = now() - Duration::hours(24);

        let mut image_only = raw("https://a.example/img", "2024-03-15T10:00:00Z");
        image_only.title = Some("<img src=x>".to_string());
        assert!(admit(image_only, cutoff, None).is_none());

        let mut control_only = raw("https://a.example/ctl", "2024-03-15T10:00:00Z");
        control_only.title = Some("<b>\u{1}</b>".to_string());
        assert!(admit(control_only, cutoff, None).is_none());

        let mut marked_up = raw("https://a.example/ok", "2024-03-15T10:00:00Z");
        marked_up.title = Some("<b>Markets</b> rally".to_string());
        assert!(admit(marked_up, cutoff, None).is_some());
    }

    #[test]
    fn test_options_allow_list_scope() {
        let mut config = Config::default();
        let regional = Category::Regional("Asia".to_string());

        assert!(FetchOptions::for_category(&config, &regional).allow_list.is_none());

        config.quality_sources.enabled = true;
        assert!(FetchOptions::for_category(&config, &regional).allow_list.is_some());
        assert!(
            FetchOptions::for_category(&config, &Category::Topical("Health".to_string()))
                .allow_list
                .is_some()
        );
        assert!(FetchOptions::for_category(&config, &Category::Global).allow_list.is_none());

        let options = FetchOptions::for_category(&config, &Category::Global);
        assert_eq!(options.max_phrases, 2);
        assert_eq!(options.recency, Duration::hours(24));
    }
}
