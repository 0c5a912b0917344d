//! Content extractor (C3): fetches and extracts article text via
//! `readability`, grounded on the teacher's
//! `workers::decision::extraction::extract_article_text` -- same
//! retry/backoff shape, trimmed to the plain `Result<_, ExtractError>` the
//! rest of this crate uses instead of the teacher's `Result<_, bool>`
//! access-denied signal.

use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::TARGET_WEB_REQUEST;

const MAX_RETRIES: u32 = 3;
const EXTRACT_TIMEOUT_SECS: u64 = 60;

pub struct Extracted {
    pub title: String,
    pub text: String,
}

pub async fn extract_article(url: &str) -> Result<Extracted, ExtractError> {
    let mut backoff = Duration::from_secs(2);

    for attempt in 0..MAX_RETRIES {
        debug!(target: TARGET_WEB_REQUEST, url, attempt, "extracting article");
        let url_owned = url.to_string();
        let scrape = tokio::task::spawn_blocking(move || readability::extractor::scrape(&url_owned));

        match timeout(Duration::from_secs(EXTRACT_TIMEOUT_SECS), scrape).await {
            Ok(Ok(Ok(product))) => {
                if product.text.trim().is_empty() {
                    return Err(ExtractError::Failed(format!(
                        "{}: extracted empty article",
                        url
                    )));
                }
                return Ok(Extracted {
                    title: product.title,
                    text: product.text,
                });
            }
            Ok(Ok(Err(e))) => {
                warn!(target: TARGET_WEB_REQUEST, url, attempt, error = %e, "extraction attempt failed");
            }
            Ok(Err(e)) => {
                warn!(target: TARGET_WEB_REQUEST, url, attempt, error = %e, "extraction task panicked");
            }
            Err(_) => {
                warn!(target: TARGET_WEB_REQUEST, url, attempt, "extraction timed out");
            }
        }

        if attempt + 1 < MAX_RETRIES {
            sleep(backoff).await;
            backoff *= 2;
        }
    }

    Err(ExtractError::Failed(format!(
        "{}: failed after {} retries",
        url, MAX_RETRIES
    )))
}
