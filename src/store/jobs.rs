use super::core::Store;
use super::types::{JobStatus, ScheduledJob};
use crate::error::StoreError;
use crate::util::now_naive_iso;

impl Store {
    pub async fn start_job(&self, name: &str) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO scheduled_jobs (name, status, started_at) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(JobStatus::Running.to_string())
        .bind(now_naive_iso())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(result.last_insert_rowid())
    }

    pub async fn finish_job(
        &self,
        job_id: i64,
        status: JobStatus,
        detail: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE scheduled_jobs SET status = ?, finished_at = ?, detail = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(now_naive_iso())
            .bind(detail)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    /// Most recent row for each named job, what `GET /scheduler/status` reports.
    pub async fn last_job(&self, name: &str) -> Result<Option<ScheduledJob>, StoreError> {
        sqlx::query_as::<_, ScheduledJob>(
            "SELECT * FROM scheduled_jobs WHERE name = ? ORDER BY started_at DESC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::core::test_store;

    #[tokio::test]
    async fn last_job_reflects_the_most_recent_finish() {
        let store = test_store().await;
        assert!(store.last_job("feed_refresh").await.unwrap().is_none());

        let id = store.start_job("feed_refresh").await.unwrap();
        store.finish_job(id, JobStatus::Success, Some("ok")).await.unwrap();

        let last = store.last_job("feed_refresh").await.unwrap().expect("a row");
        assert_eq!(last.status, "success");
        assert_eq!(last.detail.as_deref(), Some("ok"));
    }
}
