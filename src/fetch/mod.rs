//! Feed fetcher (C4): priority+fairness ordered feed refresh, conditional
//! GET, brotli fallback decompression, bounded worker pool. Grounded on the
//! teacher's `rss::fetcher::process_rss_urls` loop, generalized from an
//! infinite `sleep(600)` loop into a single bounded refresh pass the
//! scheduler invokes on a cron tick (§4.4).

pub mod parser;

use futures::stream::{self, StreamExt};
use reqwest::header;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::FetchConfig;
use crate::store::Store;
use crate::util::from_naive_iso;
use crate::TARGET_FETCH;

pub struct RefreshSummary {
    pub feeds_attempted: usize,
    pub feeds_failed: usize,
    pub articles_added: usize,
    pub cached_304: usize,
    pub elapsed_ms: u128,
}

/// Result of a single feed fetch: either a fresh body (with whatever
/// validators the response carried) or a 304 confirming the cached copy is
/// still current (§4.4 step 2).
enum FeedFetchOutcome {
    Fetched {
        entries: Vec<parser::FeedEntry>,
        etag: Option<String>,
        last_modified: Option<String>,
    },
    NotModified {
        etag: Option<String>,
        last_modified: Option<String>,
    },
}

/// Refreshes every active feed up to the configured caps, respecting a
/// wall-clock budget (`max_refresh_time_secs`) rather than a per-feed one.
pub async fn refresh_all_feeds(store: &Store, client: &reqwest::Client, cfg: &FetchConfig) -> RefreshSummary {
    let started = tokio::time::Instant::now();
    let deadline = started + Duration::from_secs(cfg.max_refresh_time_secs);

    let feeds = match store.list_active_feeds().await {
        Ok(feeds) => feeds,
        Err(e) => {
            error!(target: TARGET_FETCH, error = %e, "failed to list active feeds");
            return RefreshSummary {
                feeds_attempted: 0,
                feeds_failed: 0,
                articles_added: 0,
                cached_304: 0,
                elapsed_ms: started.elapsed().as_millis(),
            };
        }
    };

    let feeds_attempted = feeds.len();
    let max_items_per_feed = cfg.max_items_per_feed;
    let max_items_total = cfg.max_items_per_refresh;

    let results = stream::iter(feeds)
        .map(|feed| {
            let client = client.clone();
            async move {
                if tokio::time::Instant::now() >= deadline {
                    debug!(target: TARGET_FETCH, feed_id = feed.id, "refresh deadline reached, skipping feed");
                    return (
                        feed.id,
                        Ok(FeedFetchOutcome::Fetched { entries: Vec::new(), etag: None, last_modified: None }),
                    );
                }
                let outcome = fetch_one_feed(
                    &client,
                    &feed.url,
                    feed.etag.as_deref(),
                    feed.last_modified.as_deref(),
                    max_items_per_feed,
                )
                .await;
                (feed.id, outcome)
            }
        })
        .buffer_unordered(cfg.feed_worker_pool)
        .collect::<Vec<_>>()
        .await;

    let mut feeds_failed = 0;
    let mut articles_added = 0;
    let mut cached_304 = 0;

    for (feed_id, outcome) in results {
        if articles_added >= max_items_total {
            continue;
        }
        match outcome {
            Ok(FeedFetchOutcome::Fetched { entries, etag, last_modified }) => {
                match persist_entries(store, feed_id, entries).await {
                    Ok(inserted) => articles_added += inserted,
                    Err(e) => warn!(target: TARGET_FETCH, feed_id, error = %e, "failed to persist fetched entries"),
                }
                if let Err(e) = store
                    .record_fetch_success(feed_id, etag.as_deref(), last_modified.as_deref())
                    .await
                {
                    warn!(target: TARGET_FETCH, feed_id, error = %e, "failed to record fetch success");
                }
            }
            Ok(FeedFetchOutcome::NotModified { etag, last_modified }) => {
                cached_304 += 1;
                if let Err(e) = store
                    .record_fetch_success(feed_id, etag.as_deref(), last_modified.as_deref())
                    .await
                {
                    warn!(target: TARGET_FETCH, feed_id, error = %e, "failed to record fetch success");
                }
            }
            Err(e) => {
                feeds_failed += 1;
                warn!(target: TARGET_FETCH, feed_id, error = %e, "feed fetch failed");
                if let Err(e) = store.record_fetch_failure(feed_id).await {
                    warn!(target: TARGET_FETCH, feed_id, error = %e, "failed to record fetch failure");
                }
            }
        }
    }

    let elapsed_ms = started.elapsed().as_millis();
    info!(
        target: TARGET_FETCH,
        feeds_attempted, feeds_failed, articles_added, cached_304, elapsed_ms, "feed refresh pass complete"
    );

    RefreshSummary {
        feeds_attempted,
        feeds_failed,
        articles_added,
        cached_304,
        elapsed_ms,
    }
}

/// Issues a conditional GET when the feed carries stored validators; a 304
/// response short-circuits straight to `NotModified` without touching the
/// body (§4.4 step 2).
async fn fetch_one_feed(
    client: &reqwest::Client,
    url: &str,
    etag: Option<&str>,
    last_modified: Option<&str>,
    max_items: usize,
) -> anyhow::Result<FeedFetchOutcome> {
    let mut request = client.get(url);
    if let Some(etag) = etag {
        request = request.header(header::IF_NONE_MATCH, etag);
    }
    if let Some(last_modified) = last_modified {
        request = request.header(header::IF_MODIFIED_SINCE, last_modified);
    }

    let response = request.send().await?;

    let response_etag = response
        .headers()
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let response_last_modified = response
        .headers()
        .get(header::LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if response.status() == reqwest::StatusCode::NOT_MODIFIED {
        return Ok(FeedFetchOutcome::NotModified {
            etag: response_etag.or_else(|| etag.map(str::to_string)),
            last_modified: response_last_modified.or_else(|| last_modified.map(str::to_string)),
        });
    }

    if !response.status().is_success() {
        anyhow::bail!("non-success status {} from {}", response.status(), url);
    }

    let content_encoding = response
        .headers()
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    let bytes = response.bytes().await?;

    let decoded = if content_encoding.as_deref() == Some("br") {
        let mut decoded = Vec::new();
        let mut reader = brotli::Decompressor::new(&bytes[..], 4096);
        if reader.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
            decoded
        } else {
            bytes.to_vec()
        }
    } else {
        bytes.to_vec()
    };

    let text = String::from_utf8_lossy(&decoded).into_owned();
    let (_title, mut entries) = parser::parse_feed(&text)?;
    entries.truncate(max_items);

    Ok(FeedFetchOutcome::Fetched {
        entries,
        etag: response_etag,
        last_modified: response_last_modified,
    })
}

/// Stores newly discovered entries, skipping URLs already known. Returns the
/// count of articles actually inserted.
async fn persist_entries(
    store: &Store,
    feed_id: i64,
    entries: Vec<parser::FeedEntry>,
) -> anyhow::Result<usize> {
    let mut inserted = 0;
    for entry in entries {
        let published = entry
            .published
            .map(crate::util::to_naive_iso)
            .unwrap_or_else(crate::util::now_naive_iso);

        if from_naive_iso(&published).is_none() {
            continue;
        }

        if store
            .insert_article_if_absent(feed_id, &entry.url, &entry.title, &published)
            .await?
            .is_some()
        {
            inserted += 1;
        }
    }
    Ok(inserted)
}
