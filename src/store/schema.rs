//! Table and index definitions, applied idempotently at startup.
//!
//! Grounded on the teacher's `db/schema.rs`: plain `CREATE TABLE IF NOT
//! EXISTS` strings run inside a single migration function rather than a
//! migration framework, WAL mode enabled on the same connection.

use sqlx::SqlitePool;

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feeds (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            title TEXT,
            etag TEXT,
            last_modified TEXT,
            last_fetched_at TEXT,
            priority INTEGER NOT NULL DEFAULT 0,
            consecutive_failures INTEGER NOT NULL DEFAULT 0,
            health_score REAL NOT NULL DEFAULT 100.0,
            active BOOLEAN NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            feed_id INTEGER NOT NULL REFERENCES feeds(id),
            url TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            published TEXT NOT NULL,
            content_hash TEXT,
            extracted_text TEXT,
            summary_json TEXT,
            summary_model TEXT,
            fallback_summary TEXT,
            entities_json TEXT,
            entities_model TEXT,
            topic TEXT,
            topic_confidence REAL,
            ranking_score REAL NOT NULL DEFAULT 0.0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_content_hash ON articles(content_hash)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_topic ON articles(topic)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cluster_hash TEXT NOT NULL,
            topic TEXT NOT NULL,
            headline TEXT NOT NULL,
            narrative_json TEXT NOT NULL,
            story_type TEXT NOT NULL,
            importance_score REAL NOT NULL,
            freshness_score REAL NOT NULL,
            quality_score REAL NOT NULL,
            article_count INTEGER NOT NULL,
            title_source TEXT NOT NULL DEFAULT 'llm',
            parse_strategy TEXT NOT NULL DEFAULT 'direct',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            archived BOOLEAN NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_stories_created_at ON stories(created_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_stories_archived ON stories(archived)")
        .execute(pool)
        .await?;
    // Two active stories may never share a cluster_hash, but an archived one
    // may reuse a hash a later active story also has (§3, §9).
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_stories_active_cluster_hash \
         ON stories(cluster_hash) WHERE archived = 0",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS story_articles (
            story_id INTEGER NOT NULL REFERENCES stories(id),
            article_id INTEGER NOT NULL REFERENCES articles(id),
            primary_article BOOLEAN NOT NULL DEFAULT 0,
            relevance REAL NOT NULL DEFAULT 1.0,
            PRIMARY KEY (story_id, article_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scheduled_jobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            detail TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_name_started ON scheduled_jobs(name, started_at)")
        .execute(pool)
        .await?;

    Ok(())
}
