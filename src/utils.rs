//! Utility functions for text sanitization, date formatting, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - Parsing NewsAPI timestamps and rendering them in RFC 2822 form
//! - Stripping HTML and XML-illegal characters from feed text
//! - String truncation for logging
//! - Output directory preparation

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

/// The exact timestamp format NewsAPI uses for `publishedAt`.
pub const API_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// RSS `pubDate` format, always expressed in UTC.
pub const RSS_TIME_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// Placeholder for items whose description is empty or absent.
pub const NO_DESCRIPTION: &str = "No description available.";

/// Everything outside the XML 1.0 `Char` production below the astral planes.
static XML_ILLEGAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\x09\x0A\x0D\x20-\x{D7FF}\x{E000}-\x{FFFD}]").expect("static regex is valid")
});

/// Parse a NewsAPI `publishedAt` value (`YYYY-MM-DDTHH:MM:SSZ`).
///
/// Any other shape, including RFC 3339 offsets or fractional seconds,
/// yields `None`.
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, API_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render a UTC time as an RSS date, e.g. `Fri, 15 Mar 2024 08:30:00 +0000`.
pub fn to_rss_date(dt: DateTime<Utc>) -> String {
    dt.format(RSS_TIME_FORMAT).to_string()
}

/// Convert a `publishedAt` value to an RSS date.
///
/// Unparseable input falls back to `now` rather than failing the feed.
pub fn format_pub_date(raw: &str, now: DateTime<Utc>) -> String {
    match parse_published_at(raw) {
        Some(dt) => to_rss_date(dt),
        None => {
            debug!(%raw, "Unparseable publishedAt; using build time");
            to_rss_date(now)
        }
    }
}

/// Strip HTML markup, keeping only the text content.
///
/// Entities are decoded (`&amp;` becomes `&`); the XML writer escapes
/// them again on output.
pub fn strip_html(text: &str) -> String {
    if !text.contains('<') && !text.contains('&') {
        return text.to_string();
    }
    let fragment = Html::parse_fragment(text);
    fragment.root_element().text().collect::<String>()
}

/// Remove characters that may not appear in an XML document.
pub fn strip_xml_illegal(text: &str) -> String {
    XML_ILLEGAL.replace_all(text, "").into_owned()
}

/// Make API text safe for a feed element: no markup, no illegal characters.
pub fn sanitize_text(text: &str) -> String {
    strip_xml_illegal(&strip_html(text)).trim().to_string()
}

/// Sanitize an optional description, substituting [`NO_DESCRIPTION`] when
/// nothing is left.
pub fn sanitize_description(description: Option<&str>) -> String {
    match description.map(sanitize_text) {
        Some(text) if !text.is_empty() => text,
        _ => NO_DESCRIPTION.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to at most `max` bytes (backing off to a char
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Ensure the directory that will hold `path` exists.
///
/// A bare file name (no parent component) needs nothing.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_parent_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).await?;
            debug!(parent = %parent.display(), "Output directory ready");
            Ok(())
        }
        _ => Ok(()),
    }
}
