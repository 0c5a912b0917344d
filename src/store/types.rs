//! Value objects persisted by the store (§3).

use crate::entity::types::EntitySet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub last_fetched_at: Option<String>,
    pub priority: i64,
    pub consecutive_failures: i64,
    pub health_score: f64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub url: String,
    pub title: String,
    pub published: String,
    pub content_hash: Option<String>,
    pub extracted_text: Option<String>,
    pub summary_json: Option<String>,
    pub summary_model: Option<String>,
    pub fallback_summary: Option<String>,
    pub entities_json: Option<String>,
    pub entities_model: Option<String>,
    pub topic: Option<String>,
    pub topic_confidence: Option<f64>,
    pub ranking_score: f64,
    pub created_at: String,
}

/// The structured per-article summary returned by the Summariser (§4.6).
/// `bullets`/`why_it_matters`/`tags` are the LLM's JSON contract; the rest
/// is bookkeeping the summarizer attaches once that contract is satisfied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredSummary {
    pub bullets: Vec<String>,
    pub why_it_matters: String,
    pub tags: Vec<String>,
    pub processing_method: String,
    pub is_chunked: bool,
    pub chunk_count: Option<i64>,
    pub total_tokens: Option<i64>,
    pub content_hash: String,
    pub model: String,
    pub generated_at: String,
}

impl Article {
    pub fn summary(&self) -> Option<StructuredSummary> {
        self.summary_json
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
    }

    pub fn entities(&self) -> Option<EntitySet> {
        self.entities_json
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
    }
}

/// The prose content of a Story, serialized into `Story.narrative_json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeContent {
    pub synthesis: String,
    pub key_points: Vec<String>,
    pub why_it_matters: String,
    pub topics: Vec<String>,
    pub entities: Vec<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Story {
    pub id: i64,
    pub cluster_hash: String,
    pub topic: String,
    pub headline: String,
    pub narrative_json: String,
    pub story_type: String,
    pub importance_score: f64,
    pub freshness_score: f64,
    pub quality_score: f64,
    pub article_count: i64,
    pub title_source: String,
    pub parse_strategy: String,
    pub created_at: String,
    pub updated_at: String,
    pub archived: bool,
}

impl Story {
    pub fn narrative(&self) -> Option<NarrativeContent> {
        serde_json::from_str(&self.narrative_json).ok()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoryArticle {
    pub story_id: i64,
    pub article_id: i64,
    pub primary_article: bool,
    pub relevance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Success,
    Failed,
    Cancelled,
    Skipped,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduledJob {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub detail: Option<String>,
}

/// Filter accepted by `stories::list_stories` (§6 `GET /stories`).
#[derive(Debug, Clone)]
pub struct StoryFilter {
    pub topic: Option<String>,
    pub status: StoryStatusFilter,
    pub order_by: StoryOrderBy,
    pub limit: i64,
    pub offset: i64,
}

impl Default for StoryFilter {
    fn default() -> Self {
        StoryFilter {
            topic: None,
            status: StoryStatusFilter::Active,
            order_by: StoryOrderBy::Quality,
            limit: 50,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryStatusFilter {
    Active,
    Archived,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryOrderBy {
    Quality,
    Importance,
    Freshness,
    CreatedAt,
}

impl StoryOrderBy {
    pub(crate) fn column(self) -> &'static str {
        match self {
            StoryOrderBy::Quality => "quality_score",
            StoryOrderBy::Importance => "importance_score",
            StoryOrderBy::Freshness => "freshness_score",
            StoryOrderBy::CreatedAt => "created_at",
        }
    }
}

/// Filter accepted by `articles::list_articles` (§6 `GET /items`).
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub story_id: Option<i64>,
    pub topic: Option<String>,
    pub feed_id: Option<i64>,
    pub since_hours: Option<i64>,
    pub published_after: Option<String>,
    pub published_before: Option<String>,
    pub has_story: Option<bool>,
    pub limit: i64,
}
