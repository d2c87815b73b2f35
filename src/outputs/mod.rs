//! Output generation.
//!
//! # Submodules
//!
//! - [`rss`]: Assembles the day's batches into an RSS 2.0 document and writes it
//!
//! # Output Structure
//!
//! ```text
//! daily_newsletter.xml   # overwritten on every run
//! ```

pub mod rss;
