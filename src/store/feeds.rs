use super::core::Store;
use super::types::Feed;
use crate::error::StoreError;
use crate::util::now_naive_iso;

impl Store {
    /// Inserts a feed if its URL is new, otherwise leaves the existing row
    /// untouched. Returns the row either way (§4.4 feed registration).
    pub async fn upsert_feed(&self, url: &str, priority: i64) -> Result<Feed, StoreError> {
        sqlx::query("INSERT OR IGNORE INTO feeds (url, priority) VALUES (?, ?)")
            .bind(url)
            .bind(priority)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        sqlx::query_as::<_, Feed>("SELECT * FROM feeds WHERE url = ?")
            .bind(url)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    /// Active feeds ordered by priority (desc) then least-recently-fetched
    /// first, the priority+fairness ordering the fetcher's worker pool
    /// consumes (§4.4).
    pub async fn list_active_feeds(&self) -> Result<Vec<Feed>, StoreError> {
        sqlx::query_as::<_, Feed>(
            "SELECT * FROM feeds WHERE active = 1 \
             ORDER BY priority DESC, last_fetched_at ASC NULLS FIRST",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    pub async fn record_fetch_success(
        &self,
        feed_id: i64,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE feeds SET last_fetched_at = ?, etag = ?, last_modified = ?, \
             consecutive_failures = 0, health_score = MIN(100.0, health_score + 5.0) WHERE id = ?",
        )
        .bind(now_naive_iso())
        .bind(etag)
        .bind(last_modified)
        .bind(feed_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    /// Bumps the failure counter, degrades `health_score`, and deactivates
    /// the feed once it crosses the threshold. `health_score` is a simple
    /// derived value (not a full health-scoring subsystem, which is out of
    /// scope) kept monotone-bounded in [0, 100] per the store invariant.
    pub async fn record_fetch_failure(&self, feed_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE feeds SET last_fetched_at = ?, consecutive_failures = consecutive_failures + 1, \
             health_score = MAX(0.0, health_score - 20.0) WHERE id = ?",
        )
        .bind(now_naive_iso())
        .bind(feed_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        const MAX_CONSECUTIVE_FAILURES: i64 = 10;
        sqlx::query("UPDATE feeds SET active = 0 WHERE id = ? AND consecutive_failures >= ?")
            .bind(feed_id)
            .bind(MAX_CONSECUTIVE_FAILURES)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        Ok(())
    }

    pub async fn feed_health_score(&self, feed_id: i64) -> Result<f64, StoreError> {
        let row: (f64,) = sqlx::query_as("SELECT health_score FROM feeds WHERE id = ?")
            .bind(feed_id)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(row.0)
    }
}
