//! Daily query planning.
//!
//! Maps the current weekday to the day's regional and topical focus, and a
//! category key to the ordered search phrases used to query it.

use crate::config::{Config, Rotation};
use chrono::Local;
use std::error::Error;
use tracing::debug;

#[derive(Debug)]
pub struct Planner<'a> {
    config: &'a Config,
}

impl<'a> Planner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Look up the region and topic for a weekday name such as `"Wednesday"`.
    ///
    /// # Errors
    ///
    /// A weekday missing from the rotation table is a configuration error.
    pub fn rotation_for(&self, weekday: &str) -> Result<&'a Rotation, Box<dyn Error>> {
        self.config
            .rotation
            .get(weekday)
            .ok_or_else(|| format!("no rotation configured for weekday {weekday:?}").into())
    }

    /// Search phrases for a region, topic, or `"Global"`.
    ///
    /// Unknown keys fall back to a single phrase: the key lowercased.
    pub fn phrases_for(&self, key: &str) -> Vec<String> {
        match self.config.phrases.get(key) {
            Some(phrases) if !phrases.is_empty() => phrases.clone(),
            _ => {
                debug!(%key, "No phrases configured; falling back to key");
                vec![key.to_lowercase()]
            }
        }
    }
}

/// Today's local weekday name, e.g. `"Friday"`.
pub fn today() -> String {
    Local::now().format("%A").to_string()
}
