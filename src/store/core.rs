//! Connection pool setup, grounded on the teacher's `db/core.rs`: WAL mode,
//! a bounded pool, and a thin `Store` newtype the rest of the crate depends
//! on instead of `SqlitePool` directly.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::TARGET_DB;

#[derive(Clone)]
pub struct Store {
    pub(crate) pool: SqlitePool,
}

impl Store {
    pub async fn connect(database_path: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", database_path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        // A `:memory:` database is private to the connection that opened it,
        // so a pool of more than one connection would see inconsistent data
        // across connections. Single-connection pool for that case only.
        let max_connections = if database_path == ":memory:" { 1 } else { 8 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!(target: TARGET_DB, path = database_path, "connected to store");

        super::schema::migrate(&pool).await?;
        info!(target: TARGET_DB, "schema migration complete");

        Ok(Store { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
pub async fn test_store() -> Store {
    Store::connect(":memory:").await.expect("in-memory store")
}
