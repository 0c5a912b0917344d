use super::core::Store;
use super::types::{Story, StoryFilter, StoryStatusFilter};
use crate::error::StoreError;
use crate::util::{now_naive_iso, window_start_naive_iso};

/// An article's membership in a story being created: its id, whether it is
/// the primary (representative) article, and its relevance 0..1 (§3
/// "StoryArticle").
pub struct MemberArticle {
    pub article_id: i64,
    pub primary: bool,
    pub relevance: f64,
}

pub struct NewStory<'a> {
    pub cluster_hash: &'a str,
    pub topic: &'a str,
    pub headline: &'a str,
    pub narrative_json: &'a str,
    pub story_type: &'a str,
    pub importance_score: f64,
    pub freshness_score: f64,
    pub quality_score: f64,
    pub title_source: &'a str,
    pub parse_strategy: &'a str,
    pub members: &'a [MemberArticle],
}

impl Store {
    /// Creates a story row, rejecting with `StoreError::AlreadyExists` if its
    /// `cluster_hash` is already present -- the duplicate-suppression
    /// mechanism described in §4.8/§8 rather than an in-memory seen-set.
    pub async fn create_story(&self, new: &NewStory<'_>) -> Result<Story, StoreError> {
        let now = now_naive_iso();
        let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;

        let result = sqlx::query(
            "INSERT INTO stories \
             (cluster_hash, topic, headline, narrative_json, story_type, \
              importance_score, freshness_score, quality_score, article_count, \
              title_source, parse_strategy, created_at, updated_at, archived) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(new.cluster_hash)
        .bind(new.topic)
        .bind(new.headline)
        .bind(new.narrative_json)
        .bind(new.story_type)
        .bind(new.importance_score)
        .bind(new.freshness_score)
        .bind(new.quality_score)
        .bind(new.members.len() as i64)
        .bind(new.title_source)
        .bind(new.parse_strategy)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        let story_id = result.last_insert_rowid();

        for member in new.members {
            sqlx::query(
                "INSERT INTO story_articles (story_id, article_id, primary_article, relevance) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(story_id)
            .bind(member.article_id)
            .bind(member.primary)
            .bind(member.relevance)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;
        }

        tx.commit().await.map_err(StoreError::from_sqlx)?;

        sqlx::query_as::<_, Story>("SELECT * FROM stories WHERE id = ?")
            .bind(story_id)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    /// Cluster hashes of every non-archived story in the window, used by the
    /// clusterer to skip clusters it has already synthesised.
    pub async fn list_active_story_cluster_hashes(
        &self,
        window_hours: i64,
    ) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT cluster_hash FROM stories WHERE archived = 0 AND created_at >= ?",
        )
        .bind(window_start_naive_iso(window_hours))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(rows.into_iter().map(|(h,)| h).collect())
    }

    pub async fn get_story(&self, id: i64) -> Result<Option<Story>, StoreError> {
        sqlx::query_as::<_, Story>("SELECT * FROM stories WHERE id = ? AND archived = 0")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    /// Same conditional-clause-building idiom as `articles::list_articles`.
    /// `apply_interests` has no effect today: there is no interest-profile
    /// data model to blend against, so stories are always ordered by the
    /// requested column (quality desc by default, per §4.10).
    pub async fn list_stories(&self, filter: &StoryFilter) -> Result<Vec<Story>, StoreError> {
        let mut conditions = Vec::new();
        match filter.status {
            StoryStatusFilter::Active => conditions.push("archived = 0".to_string()),
            StoryStatusFilter::Archived => conditions.push("archived = 1".to_string()),
            StoryStatusFilter::All => {}
        }
        if filter.topic.is_some() {
            conditions.push("topic = ?".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT * FROM stories{} ORDER BY {} DESC, created_at DESC LIMIT ? OFFSET ?",
            where_clause,
            filter.order_by.column()
        );

        let mut q = sqlx::query_as::<_, Story>(&query);
        if let Some(topic) = &filter.topic {
            q = q.bind(topic);
        }
        q = q.bind(filter.limit).bind(filter.offset);

        q.fetch_all(&self.pool).await.map_err(StoreError::from_sqlx)
    }

    /// Article ids for a story, primary article first then by relevance
    /// desc (§3 "StoryArticle").
    pub async fn list_story_article_ids(&self, story_id: i64) -> Result<Vec<i64>, StoreError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT article_id FROM story_articles WHERE story_id = ? \
             ORDER BY primary_article DESC, relevance DESC",
        )
        .bind(story_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Archival never deletes rows; it flips `archived` so history stays
    /// queryable (Open Question resolution, §9).
    pub async fn archive_stories_older_than(&self, days: i64) -> Result<u64, StoreError> {
        let cutoff = window_start_naive_iso(days * 24);
        let result = sqlx::query("UPDATE stories SET archived = 1 WHERE created_at < ? AND archived = 0")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::core::test_store;

    async fn seed_articles(store: &Store, n: i64) -> Vec<i64> {
        let feed = store.upsert_feed("https://example.test/feed", 0).await.unwrap();
        let mut ids = Vec::new();
        for i in 0..n {
            let article = store
                .insert_article_if_absent(
                    feed.id,
                    &format!("https://example.test/{}", i),
                    &format!("article {}", i),
                    "2026-07-28T00:00:00",
                )
                .await
                .unwrap()
                .unwrap();
            ids.push(article.id);
        }
        ids
    }

    fn new_story<'a>(hash: &'a str, members: &'a [MemberArticle]) -> NewStory<'a> {
        NewStory {
            cluster_hash: hash,
            topic: "ai-ml",
            headline: "Headline",
            narrative_json: "{}",
            story_type: "breaking",
            importance_score: 0.5,
            freshness_score: 0.9,
            quality_score: 0.6,
            title_source: "llm",
            parse_strategy: "direct",
            members,
        }
    }

    #[tokio::test]
    async fn create_story_records_article_count_and_membership() {
        let store = test_store().await;
        let ids = seed_articles(&store, 2).await;
        let members = vec![
            MemberArticle { article_id: ids[0], primary: true, relevance: 1.0 },
            MemberArticle { article_id: ids[1], primary: false, relevance: 0.4 },
        ];

        let story = store.create_story(&new_story("hash-1", &members)).await.unwrap();
        assert_eq!(story.article_count, 2);

        let ordered = store.list_story_article_ids(story.id).await.unwrap();
        assert_eq!(ordered, vec![ids[0], ids[1]]);
    }

    #[tokio::test]
    async fn list_story_article_ids_orders_primary_first_then_relevance() {
        let store = test_store().await;
        let ids = seed_articles(&store, 3).await;
        // Insert with the primary last and relevance out of order, to prove
        // the ordering comes from the query, not insertion order.
        let members = vec![
            MemberArticle { article_id: ids[0], primary: false, relevance: 0.2 },
            MemberArticle { article_id: ids[1], primary: false, relevance: 0.9 },
            MemberArticle { article_id: ids[2], primary: true, relevance: 1.0 },
        ];

        let story = store.create_story(&new_story("hash-2", &members)).await.unwrap();
        let ordered = store.list_story_article_ids(story.id).await.unwrap();
        assert_eq!(ordered, vec![ids[2], ids[1], ids[0]]);
    }

    #[tokio::test]
    async fn duplicate_cluster_hash_is_rejected() {
        let store = test_store().await;
        let ids = seed_articles(&store, 1).await;
        let members = vec![MemberArticle { article_id: ids[0], primary: true, relevance: 1.0 }];

        store.create_story(&new_story("dup-hash", &members)).await.unwrap();
        let err = store.create_story(&new_story("dup-hash", &members)).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn list_stories_excludes_archived_by_default() {
        let store = test_store().await;
        let ids = seed_articles(&store, 1).await;
        let members = vec![MemberArticle { article_id: ids[0], primary: true, relevance: 1.0 }];
        store.create_story(&new_story("hash-archive", &members)).await.unwrap();

        assert_eq!(store.list_stories(&StoryFilter::default()).await.unwrap().len(), 1);

        let archived = store.archive_stories_older_than(-1).await.unwrap();
        assert_eq!(archived, 1);

        assert!(store.list_stories(&StoryFilter::default()).await.unwrap().is_empty());

        let all = StoryFilter { status: StoryStatusFilter::All, ..Default::default() };
        assert_eq!(store.list_stories(&all).await.unwrap().len(), 1);
    }
}
