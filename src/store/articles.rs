use super::core::Store;
use super::types::{Article, ArticleFilter};
use crate::entity::types::EntitySet;
use crate::error::StoreError;
use crate::store::types::StructuredSummary;
use crate::util::{now_naive_iso, window_start_naive_iso};

impl Store {
    /// Inserts a new article row keyed on URL uniqueness; a duplicate URL is
    /// not an error, it is simply skipped (§4.4 dedup by URL).
    pub async fn insert_article_if_absent(
        &self,
        feed_id: i64,
        url: &str,
        title: &str,
        published: &str,
    ) -> Result<Option<Article>, StoreError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO articles (feed_id, url, title, published, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(feed_id)
        .bind(url)
        .bind(title)
        .bind(published)
        .bind(now_naive_iso())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let article = sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE url = ?")
            .bind(url)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(Some(article))
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>, StoreError> {
        sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    /// Builds `WHERE` clauses one condition at a time the way the teacher's
    /// `fetch_unseen_articles` does, so only the filters the caller actually
    /// set show up in the query (§6 `GET /items`).
    pub async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>, StoreError> {
        let mut conditions = Vec::new();
        let mut joins = String::new();

        if filter.story_id.is_some() {
            joins.push_str(" JOIN story_articles sa ON sa.article_id = articles.id");
            conditions.push("sa.story_id = ?".to_string());
        }
        if filter.topic.is_some() {
            conditions.push("articles.topic = ?".to_string());
        }
        if filter.feed_id.is_some() {
            conditions.push("articles.feed_id = ?".to_string());
        }
        if let Some(hours) = filter.since_hours {
            conditions.push("articles.published >= ?".to_string());
            let _ = hours; // value bound below via window_start_naive_iso
        }
        if filter.published_after.is_some() {
            conditions.push("articles.published >= ?".to_string());
        }
        if filter.published_before.is_some() {
            conditions.push("articles.published <= ?".to_string());
        }
        if let Some(has_story) = filter.has_story {
            if has_story {
                conditions.push(
                    "EXISTS (SELECT 1 FROM story_articles sa2 WHERE sa2.article_id = articles.id)"
                        .to_string(),
                );
            } else {
                conditions.push(
                    "NOT EXISTS (SELECT 1 FROM story_articles sa2 WHERE sa2.article_id = articles.id)"
                        .to_string(),
                );
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT articles.* FROM articles{}{} ORDER BY articles.published DESC LIMIT ?",
            joins, where_clause
        );

        let mut q = sqlx::query_as::<_, Article>(&query);
        if let Some(story_id) = filter.story_id {
            q = q.bind(story_id);
        }
        if let Some(topic) = &filter.topic {
            q = q.bind(topic);
        }
        if let Some(feed_id) = filter.feed_id {
            q = q.bind(feed_id);
        }
        if let Some(hours) = filter.since_hours {
            q = q.bind(window_start_naive_iso(hours));
        }
        if let Some(after) = &filter.published_after {
            q = q.bind(after);
        }
        if let Some(before) = &filter.published_before {
            q = q.bind(before);
        }
        q = q.bind(filter.limit);

        q.fetch_all(&self.pool).await.map_err(StoreError::from_sqlx)
    }

    /// Articles within the clustering time window that already carry a
    /// topic + summary + entities, i.e. ready to feed the clusterer (§4.8).
    pub async fn list_ready_for_clustering(
        &self,
        window_hours: i64,
    ) -> Result<Vec<Article>, StoreError> {
        sqlx::query_as::<_, Article>(
            "SELECT * FROM articles WHERE published >= ? \
             AND topic IS NOT NULL AND summary_json IS NOT NULL AND entities_json IS NOT NULL \
             ORDER BY published DESC",
        )
        .bind(window_start_naive_iso(window_hours))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    pub async fn set_article_text(
        &self,
        id: i64,
        content_hash: &str,
        extracted_text: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE articles SET content_hash = ?, extracted_text = ? WHERE id = ?")
            .bind(content_hash)
            .bind(extracted_text)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    pub async fn set_article_summary(
        &self,
        id: i64,
        summary: &StructuredSummary,
        model: &str,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(summary).expect("StructuredSummary always serializes");
        sqlx::query("UPDATE articles SET summary_json = ?, summary_model = ? WHERE id = ?")
            .bind(json)
            .bind(model)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    /// Written on total LLM unavailability instead of `set_article_summary`:
    /// `structured_summary` stays null, `fallback_summary` carries the first
    /// two sentences of extracted_text (or title, or a constant) (§4.6).
    pub async fn set_article_fallback_summary(
        &self,
        id: i64,
        fallback_summary: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE articles SET fallback_summary = ? WHERE id = ?")
            .bind(fallback_summary)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    /// Also updates `ranking_score` from the entity count: the clusterer
    /// seeds each new cluster with the richest (highest-entity-count)
    /// article in the window (§4.8 step 1).
    pub async fn set_article_entities(
        &self,
        id: i64,
        entities: &EntitySet,
        model: &str,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(entities).expect("EntitySet always serializes");
        let ranking_score = entities.all_names().len() as f64;
        sqlx::query(
            "UPDATE articles SET entities_json = ?, entities_model = ?, ranking_score = ? WHERE id = ?",
        )
        .bind(json)
        .bind(model)
        .bind(ranking_score)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    /// Confidence is 1.0 for an LLM direct label, 0.5-0.9 for a keyword-match
    /// fallback scaled by hit count (§4.5).
    pub async fn set_article_topic(
        &self,
        id: i64,
        topic: &str,
        confidence: f64,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE articles SET topic = ?, topic_confidence = ? WHERE id = ?")
            .bind(topic)
            .bind(confidence)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    /// Cache lookup keyed on content hash + model name (§4.6 "cache-first").
    /// A hit means the summarizer can skip the LLM round trip entirely.
    pub async fn get_cached_summary(
        &self,
        content_hash: &str,
        model: &str,
    ) -> Result<Option<StructuredSummary>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT summary_json FROM articles \
             WHERE content_hash = ? AND summary_model = ? AND summary_json IS NOT NULL LIMIT 1",
        )
        .bind(content_hash)
        .bind(model)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(row.and_then(|(json,)| serde_json::from_str(&json).ok()))
    }

    /// Unlike the summary cache, keyed on `(article_id, model)` rather than
    /// content hash -- entities are extracted per-article, not per-text, so
    /// two articles sharing identical body text still get independent
    /// extractions (§4.1/§4.7).
    pub async fn get_cached_entities(
        &self,
        article_id: i64,
        model: &str,
    ) -> Result<Option<EntitySet>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT entities_json FROM articles \
             WHERE id = ? AND entities_model = ? AND entities_json IS NOT NULL LIMIT 1",
        )
        .bind(article_id)
        .bind(model)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(row.and_then(|(json,)| serde_json::from_str(&json).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::core::test_store;

    #[tokio::test]
    async fn duplicate_url_is_silently_skipped() {
        let store = test_store().await;
        let feed = store.upsert_feed("https://example.test/feed", 0).await.unwrap();

        let first = store
            .insert_article_if_absent(feed.id, "https://example.test/a", "A", "2026-07-28T00:00:00")
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .insert_article_if_absent(feed.id, "https://example.test/a", "A (again)", "2026-07-28T01:00:00")
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn cached_summary_and_entities_round_trip_by_content_hash() {
        let store = test_store().await;
        let feed = store.upsert_feed("https://example.test/feed", 0).await.unwrap();
        let article = store
            .insert_article_if_absent(feed.id, "https://example.test/a", "A", "2026-07-28T00:00:00")
            .await
            .unwrap()
            .unwrap();

        assert!(store.get_cached_summary("hash-1", "llama3.1").await.unwrap().is_none());

        let summary = StructuredSummary {
            bullets: vec!["Something happened".to_string()],
            why_it_matters: "It changes how things work.".to_string(),
            tags: vec!["ai-ml".to_string()],
            processing_method: "direct".to_string(),
            is_chunked: false,
            chunk_count: None,
            total_tokens: None,
            content_hash: "hash-1".to_string(),
            model: "llama3.1".to_string(),
            generated_at: "2026-07-28T00:00:00".to_string(),
        };
        store.set_article_text(article.id, "hash-1", "full text").await.unwrap();
        store.set_article_summary(article.id, &summary, "llama3.1").await.unwrap();

        let cached = store
            .get_cached_summary("hash-1", "llama3.1")
            .await
            .unwrap()
            .expect("cache hit after summarizing");
        assert_eq!(cached.bullets, vec!["Something happened".to_string()]);

        // A different model name is a cache miss even for the same hash.
        assert!(store.get_cached_summary("hash-1", "other-model").await.unwrap().is_none());

        assert!(store.get_cached_entities(article.id, "llama3.1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_articles_filters_by_topic_and_has_story() {
        let store = test_store().await;
        let feed = store.upsert_feed("https://example.test/feed", 0).await.unwrap();

        let a = store
            .insert_article_if_absent(feed.id, "https://example.test/a", "A", "2026-07-28T00:00:00")
            .await
            .unwrap()
            .unwrap();
        let b = store
            .insert_article_if_absent(feed.id, "https://example.test/b", "B", "2026-07-28T00:00:00")
            .await
            .unwrap()
            .unwrap();

        store.set_article_topic(a.id, "ai-ml", 1.0).await.unwrap();
        store.set_article_topic(b.id, "politics", 1.0).await.unwrap();

        let ai_ml = ArticleFilter {
            topic: Some("ai-ml".to_string()),
            limit: 50,
            ..Default::default()
        };
        let found = store.list_articles(&ai_ml).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);

        let without_story = ArticleFilter {
            has_story: Some(false),
            limit: 50,
            ..Default::default()
        };
        assert_eq!(store.list_articles(&without_story).await.unwrap().len(), 2);

        let with_story = ArticleFilter {
            has_story: Some(true),
            limit: 50,
            ..Default::default()
        };
        assert!(store.list_articles(&with_story).await.unwrap().is_empty());
    }
}
