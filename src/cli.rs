//! Command-line interface definitions for Daily Headlines.
//!
//! The job runs with no arguments. Every option has a default or can be
//! supplied through the environment; only the NewsAPI key is required.

use clap::Parser;
use std::error::Error;

/// Command-line arguments for the Daily Headlines feed builder.
///
/// # Examples
///
/// ```sh
/// # Typical cron invocation
/// NEWS_API_KEY=... daily_headlines
///
/// # Custom config, output elsewhere, pretend it is Wednesday
/// daily_headlines --config feed.yaml --output public/feed.xml --weekday Wednesday
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// NewsAPI key
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Where to write the feed (overrides the config file)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Weekday name to plan for instead of today, e.g. "Wednesday"
    #[arg(long)]
    pub weekday: Option<String>,
}

impl Cli {
    /// The NewsAPI key, or an error when it is absent or blank.
    pub fn api_key(&self) -> Result<String, Box<dyn Error>> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => Err("NEWS_API_KEY is not set; export it or pass --api-key".into()),
        }
    }
}
