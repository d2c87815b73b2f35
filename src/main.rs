//! # Daily Headlines
//!
//! Builds a daily RSS newsletter from NewsAPI search results. Each weekday
//! has a regional and a topical focus; the feed carries world headlines
//! plus headlines for the day's region and topic.
//!
//! ## Usage
//!
//! ```sh
//! NEWS_API_KEY=... daily_headlines
//! ```
//!
//! ## Architecture
//!
//! The job is one sequential pass:
//! 1. **Planning**: Pick the day's region and topic and the search phrases for each
//! 2. **Fetching**: Query NewsAPI per phrase, filter, dedupe, and cap each batch
//! 3. **Output**: Assemble the RSS document and overwrite the feed file

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod fetcher;
mod models;
mod outputs;
mod planner;
mod utils;

use api::NewsApiClient;
use cli::Cli;
use config::Config;
use fetcher::{FetchOptions, fetch_batch};
use models::Category;
use outputs::rss;
use planner::{Planner, today};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("daily_headlines starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.output, ?args.weekday, "Parsed CLI arguments");

    let api_key = args.api_key().inspect_err(|e| error!(error = %e, "Missing NewsAPI key"))?;

    // ---- Configuration ----
    let mut config = Config::load(args.config.as_deref()).await?;
    if let Some(output) = args.output {
        config.channel.output_path = output;
    }

    // ---- Planning ----
    let planner = Planner::new(&config);
    let weekday = args.weekday.unwrap_or_else(today);
    let rotation = planner.rotation_for(&weekday)?;
    info!(%weekday, region = %rotation.region, topic = %rotation.topic, "Planned today's focus");

    // ---- Fetching ----
    let client = NewsApiClient::new(&config.api, api_key)?;
    let now = Utc::now();
    let plan = [
        (Category::Global, config.fetch.global_page_size),
        (
            Category::Regional(rotation.region.clone()),
            config.fetch.regional_page_size,
        ),
        (
            Category::Topical(rotation.topic.clone()),
            config.fetch.topical_page_size,
        ),
    ];

    let mut batches = Vec::with_capacity(plan.len());
    for (category, batch_size) in plan {
        let phrases = planner.phrases_for(category.label());
        let options = FetchOptions::for_category(&config, &category);
        debug!(category = %category.label(), ?phrases, "Fetching batch");
        batches.push(fetch_batch(&client, category, &phrases, batch_size, &options, now).await);
    }

    for batch in &batches {
        if batch.is_empty() {
            warn!(category = %batch.category.label(), "No headlines gathered for category");
        } else if batch.len() < batch.max_size {
            debug!(
                category = %batch.category.label(),
                count = batch.len(),
                max_size = batch.max_size,
                "Category batch came up short"
            );
        }
    }
    if batches.iter().all(|b| b.is_empty()) {
        warn!("No headlines gathered; writing an empty feed");
    }

    // ---- Output ----
    let output_path = PathBuf::from(&config.channel.output_path);
    let written = rss::write_feed(
        &output_path,
        &config.channel,
        rotation,
        &batches,
        Utc::now(),
    )
    .await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        items = written,
        global = batches[0].len(),
        regional = batches[1].len(),
        topical = batches[2].len(),
        path = %output_path.display(),
        "Execution complete"
    );

    Ok(())
}
