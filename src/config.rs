//! Runtime configuration with built-in defaults and optional YAML overrides.
//!
//! Every static table the job relies on (the weekday rotation, the search
//! phrase table, channel metadata, page sizes) has a default here. A YAML
//! file passed with `--config` may override any section; sections it does
//! not mention keep their defaults.
//!
//! ```yaml
//! channel:
//!   output_path: public/daily_newsletter.xml
//! fetch:
//!   max_phrases: 1
//! quality_sources:
//!   enabled: true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use tokio::fs;
use tracing::{info, instrument};

/// Weekday names in `%A` form, as used for rotation table keys.
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Upper bound for `fetch.recency_hours`; keeps `Duration::hours` in range.
pub const MAX_RECENCY_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub quality_sources: QualitySources,
    /// Weekday name -> daily focus. Must cover all seven days.
    #[serde(default = "default_rotation")]
    pub rotation: BTreeMap<String, Rotation>,
    /// Category key -> ordered search phrases.
    #[serde(default = "default_phrases")]
    pub phrases: BTreeMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            api: ApiConfig::default(),
            fetch: FetchConfig::default(),
            quality_sources: QualitySources::default(),
            rotation: default_rotation(),
            phrases: default_phrases(),
        }
    }
}

/// The regional and topical focus for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotation {
    pub region: String,
    pub topic: String,
}

/// Channel-level metadata of the generated feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_link")]
    pub link: String,
    /// `{region}` and `{topic}` are replaced with the day's focus.
    #[serde(default = "default_description")]
    pub description: String,
    /// Public URL of the feed, used for the `atom:link rel="self"` element.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    /// Where the feed file is written. Overwritten on every run.
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            link: default_link(),
            description: default_description(),
            feed_url: default_feed_url(),
            output_path: default_output_path(),
        }
    }
}

impl ChannelConfig {
    pub fn description_for(&self, rotation: &Rotation) -> String {
        self.description
            .replace("{region}", &rotation.region)
            .replace("{topic}", &rotation.topic)
    }
}

/// NewsAPI endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Per-request timeout; a request exceeding it is abandoned.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            language: default_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Batch sizes and query limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_global_page_size")]
    pub global_page_size: usize,
    #[serde(default = "default_focus_page_size")]
    pub regional_page_size: usize,
    #[serde(default = "default_focus_page_size")]
    pub topical_page_size: usize,
    /// Only the first N phrases of a category are queried.
    #[serde(default = "default_max_phrases")]
    pub max_phrases: usize,
    /// Articles older than this many hours are dropped.
    #[serde(default = "default_recency_hours")]
    pub recency_hours: i64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            global_page_size: default_global_page_size(),
            regional_page_size: default_focus_page_size(),
            topical_page_size: default_focus_page_size(),
            max_phrases: default_max_phrases(),
            recency_hours: default_recency_hours(),
        }
    }
}

/// Allow-list of reputable outlets for the regional and topical batches.
///
/// Disabled by default; when enabled, articles whose source name is not
/// listed (case-insensitive) are dropped from those two batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualitySources {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_quality_source_names")]
    pub names: Vec<String>,
}

impl Default for QualitySources {
    fn default() -> Self {
        Self {
            enabled: false,
            names: default_quality_source_names(),
        }
    }
}

impl QualitySources {
    pub fn allows(&self, source_name: &str) -> bool {
        self.names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(source_name.trim()))
    }
}

fn default_title() -> String {
    "Daily Newsletter".to_string()
}

fn default_link() -> String {
    "http://davidshadle.com".to_string()
}

fn default_description() -> String {
    "Daily curated headlines from around the world. Today's focus: {region} and {topic}."
        .to_string()
}

fn default_feed_url() -> String {
    "http://davidshadle.com/daily_newsletter.xml".to_string()
}

fn default_output_path() -> String {
    "daily_newsletter.xml".to_string()
}

fn default_endpoint() -> String {
    "https://newsapi.org/v2/everything".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_global_page_size() -> usize {
    10
}

fn default_focus_page_size() -> usize {
    5
}

fn default_max_phrases() -> usize {
    2
}

fn default_recency_hours() -> i64 {
    24
}

fn default_quality_source_names() -> Vec<String> {
    [
        "Reuters",
        "Associated Press",
        "BBC News",
        "Al Jazeera English",
        "NPR",
        "The Guardian",
        "Financial Times",
        "Bloomberg",
        "The Economist",
        "Nature",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_rotation() -> BTreeMap<String, Rotation> {
    [
        ("Monday", "Europe", "Science"),
        ("Tuesday", "Asia", "Business"),
        ("Wednesday", "South America", "Technology"),
        ("Thursday", "North America", "Health"),
        ("Friday", "Africa", "Environment"),
        ("Saturday", "Global", "Politics"),
        ("Sunday", "Local", "Society"),
    ]
    .into_iter()
    .map(|(day, region, topic)| {
        (
            day.to_string(),
            Rotation {
                region: region.to_string(),
                topic: topic.to_string(),
            },
        )
    })
    .collect()
}

fn default_phrases() -> BTreeMap<String, Vec<String>> {
    let table: &[(&str, &[&str])] = &[
        ("Global", &["world news", "international", "global"]),
        ("Europe", &["Europe", "European Union", "EU summit"]),
        ("Asia", &["Asia", "China", "India"]),
        ("South America", &["South America", "Latin America", "Brazil"]),
        ("North America", &["North America", "United States", "Canada"]),
        ("Africa", &["Africa", "African Union", "Nigeria"]),
        ("Science", &["science", "research study", "space"]),
        ("Business", &["business", "economy", "markets"]),
        ("Technology", &["technology", "artificial intelligence", "tech industry"]),
        ("Health", &["health", "public health", "medicine"]),
        ("Environment", &["environment", "climate change", "biodiversity"]),
        ("Politics", &["politics", "election", "government"]),
        ("Society", &["society", "culture", "education"]),
    ];
    table
        .iter()
        .map(|(key, phrases)| {
            (
                key.to_string(),
                phrases.iter().map(|p| p.to_string()).collect(),
            )
        })
        .collect()
}

impl Config {
    /// Load configuration from an optional YAML file.
    ///
    /// Without a path the built-in defaults are used. The result is
    /// validated either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if
    /// [`Config::validate`] rejects it.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).await?;
                let config = Self::from_yaml(&raw)?;
                info!(%path, "Loaded configuration file");
                config
            }
            None => {
                info!("No configuration file given; using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, Box<dyn Error>> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Reject configurations the job cannot run with.
    ///
    /// The rotation table must name all seven weekdays, page sizes must be
    /// within NewsAPI's `1..=100` range, at least one phrase must be
    /// queried per category, and the recency window must fit in a year.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        let missing: Vec<&str> = WEEKDAYS
            .iter()
            .copied()
            .filter(|day| !self.rotation.contains_key(*day))
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "rotation table is missing weekdays: {}",
                missing.join(", ")
            )
            .into());
        }

        for (name, size) in [
            ("global_page_size", self.fetch.global_page_size),
            ("regional_page_size", self.fetch.regional_page_size),
            ("topical_page_size", self.fetch.topical_page_size),
        ] {
            if !(1..=100).contains(&size) {
                return Err(format!("{name} must be between 1 and 100, got {size}").into());
            }
        }

        if self.fetch.max_phrases == 0 {
            return Err("max_phrases must be at least 1".into());
        }
        if !(1..=MAX_RECENCY_HOURS).contains(&self.fetch.recency_hours) {
            return Err(format!(
                "recency_hours must be between 1 and {MAX_RECENCY_HOURS}, got {}",
                self.fetch.recency_hours
            )
            .into());
        }
        Ok(())
    }
}
