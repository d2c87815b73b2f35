//! RSS 2.0 feed assembly.
//!
//! The feed is built in two steps: [`FeedDocument::assemble`] turns the day's
//! batches into sanitized channel and item records, and
//! [`FeedDocument::to_xml`] serializes them with `quick-xml`. [`write_feed`]
//! puts the result on disk, replacing whatever was there.
//!
//! # Output Shape
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
//!   <channel>
//!     <title/> <link/> <description/> <pubDate/> <lastBuildDate/>
//!     <atom:link href="..." rel="self" type="application/rss+xml"/>
//!     <item>
//!       <title/> <link/> <description/> <pubDate/> <guid isPermaLink="false"/>
//!       <category/>   (regional and topical items only)
//!       <source url="..."/>
//!     </item>
//!   </channel>
//! </rss>
//! ```

use crate::config::{ChannelConfig, Rotation};
use crate::models::{Article, CategoryBatch};
use crate::utils::{
    ensure_parent_dir, format_pub_date, sanitize_description, sanitize_text, to_rss_date,
};
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::error::Error;
use std::io::Write;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const UNKNOWN_SOURCE: &str = "Unknown";

/// Channel-level record of the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Build time in RSS date form; used for both `pubDate` and `lastBuildDate`.
    pub build_date: String,
    /// Public URL of this feed for the Atom self link.
    pub self_link: String,
}

/// One `<item>`, already sanitized and formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    /// Article URL; also written as the guid.
    pub link: String,
    pub description: String,
    pub pub_date: String,
    /// Region or topic label, `None` for global headlines.
    pub category: Option<String>,
    pub source: String,
    /// Origin of the article URL (`https://host`), when it has one.
    pub source_url: Option<String>,
}

impl FeedItem {
    pub fn from_article(article: &Article, category: Option<&str>, now: DateTime<Utc>) -> Self {
        let source = match sanitize_text(&article.source_name) {
            s if s.is_empty() => UNKNOWN_SOURCE.to_string(),
            s => s,
        };
        Self {
            title: sanitize_text(&article.title),
            link: article.url.clone(),
            description: sanitize_description(article.description.as_deref()),
            pub_date: format_pub_date(&article.published_at, now),
            category: category.map(str::to_string),
            source,
            source_url: origin_of(&article.url),
        }
    }
}

fn origin_of(link: &str) -> Option<String> {
    let origin = Url::parse(link).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

#[derive(Debug, Clone)]
pub struct FeedDocument {
    pub channel: FeedChannel,
    pub items: Vec<FeedItem>,
}

impl FeedDocument {
    /// Assemble the feed from the day's batches, in the order given.
    ///
    /// # Arguments
    ///
    /// * `config` - Static channel metadata
    /// * `rotation` - The day's region and topic, interpolated into the description
    /// * `batches` - Global, regional, and topical batches
    /// * `now` - Build time; also the fallback for unparseable item dates
    pub fn assemble(
        config: &ChannelConfig,
        rotation: &Rotation,
        batches: &[CategoryBatch],
        now: DateTime<Utc>,
    ) -> Self {
        let channel = FeedChannel {
            title: config.title.clone(),
            link: config.link.clone(),
            description: config.description_for(rotation),
            build_date: to_rss_date(now),
            self_link: config.feed_url.clone(),
        };

        let items = batches
            .iter()
            .flat_map(|batch| {
                let category = batch.category.feed_category();
                batch
                    .articles
                    .iter()
                    .map(move |article| FeedItem::from_article(article, category, now))
            })
            .collect();

        Self { channel, items }
    }

    /// Serialize to an indented RSS 2.0 document with an XML declaration.
    pub fn to_xml(&self) -> Result<String, Box<dyn Error>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", "2.0"));
        rss.push_attribute(("xmlns:atom", ATOM_NS));
        writer.write_event(Event::Start(rss))?;
        writer.write_event(Event::Start(BytesStart::new("channel")))?;

        let channel = &self.channel;
        write_text_element(&mut writer, "title", &channel.title)?;
        write_text_element(&mut writer, "link", &channel.link)?;
        write_text_element(&mut writer, "description", &channel.description)?;
        write_text_element(&mut writer, "pubDate", &channel.build_date)?;
        write_text_element(&mut writer, "lastBuildDate", &channel.build_date)?;

        let mut atom_link = BytesStart::new("atom:link");
        atom_link.push_attribute(("href", channel.self_link.as_str()));
        atom_link.push_attribute(("rel", "self"));
        atom_link.push_attribute(("type", "application/rss+xml"));
        writer.write_event(Event::Empty(atom_link))?;

        for item in &self.items {
            write_item(&mut writer, item)?;
        }

        writer.write_event(Event::End(BytesEnd::new("channel")))?;
        writer.write_event(Event::End(BytesEnd::new("rss")))?;

        let mut out = writer.into_inner();
        out.push(b'\n');
        Ok(String::from_utf8(out)?)
    }
}

fn write_item<W: Write>(writer: &mut Writer<W>, item: &FeedItem) -> Result<(), Box<dyn Error>> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;
    write_text_element(writer, "title", &item.title)?;
    write_text_element(writer, "link", &item.link)?;
    write_text_element(writer, "description", &item.description)?;
    write_text_element(writer, "pubDate", &item.pub_date)?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "false"));
    writer.write_event(Event::Start(guid))?;
    writer.write_event(Event::Text(BytesText::new(&item.link)))?;
    writer.write_event(Event::End(BytesEnd::new("guid")))?;

    if let Some(category) = &item.category {
        write_text_element(writer, "category", category)?;
    }

    let mut source = BytesStart::new("source");
    if let Some(url) = &item.source_url {
        source.push_attribute(("url", url.as_str()));
    }
    writer.write_event(Event::Start(source))?;
    writer.write_event(Event::Text(BytesText::new(&item.source)))?;
    writer.write_event(Event::End(BytesEnd::new("source")))?;

    writer.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), Box<dyn Error>> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Build the feed and write it to `path`, overwriting any previous file.
///
/// # Returns
///
/// The number of items written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_feed(
    path: &Path,
    config: &ChannelConfig,
    rotation: &Rotation,
    batches: &[CategoryBatch],
    now: DateTime<Utc>,
) -> Result<usize, Box<dyn Error>> {
    let document = FeedDocument::assemble(config, rotation, batches, now);
    let xml = document.to_xml()?;

    ensure_parent_dir(path).await?;
    fs::write(path, &xml).await?;
    info!(items = document.items.len(), bytes = xml.len(), "Wrote RSS feed");
    Ok(document.items.len())
}
