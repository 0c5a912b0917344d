//! feed-rs based RSS/Atom parsing, grounded on the teacher's
//! `rss::parser::process_feed_content` -- same "parse with feed_rs, map
//! entries to a flat struct" shape, trimmed of the JSON-feed branch (not in
//! scope here) and the direct-to-database write.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use feed_rs::parser;
use std::io::Cursor;

pub struct FeedEntry {
    pub title: String,
    pub url: String,
    pub published: Option<DateTime<Utc>>,
}

pub fn parse_feed(body: &str) -> Result<(Option<String>, Vec<FeedEntry>)> {
    let reader = Cursor::new(body.as_bytes());
    let feed = parser::parse(reader).context("feed_rs parse failed")?;

    let title = feed.title.map(|t| t.content);

    let entries = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let url = entry.links.first().map(|link| link.href.clone())?;
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "untitled".to_string());
            let published = entry.published.or(entry.updated);
            Some(FeedEntry {
                title,
                url,
                published,
            })
        })
        .collect();

    Ok((title, entries))
}
