//! Route handlers for the HTTP surface (§6). Grounded on the teacher's
//! `app::api` handler shape (extract query/path/json, talk to the store,
//! map errors to a `StatusCode`) minus the JWT/device-id machinery, which
//! belongs to the UI layer this core does not expose.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::types::{ArticleFilter, NarrativeContent, StoryFilter, StoryOrderBy, StoryStatusFilter};
use crate::store::{Article, Store};
use crate::TARGET_WEB_REQUEST;

use super::AppState;

fn internal_error<E: std::fmt::Display>(context: &'static str) -> impl Fn(E) -> StatusCode {
    move |e| {
        warn!(target: TARGET_WEB_REQUEST, context, error = %e, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub ingested: usize,
    pub stats: RefreshStats,
}

#[derive(Serialize)]
pub struct RefreshStats {
    pub items: usize,
    pub feeds: RefreshFeedStats,
    pub performance: RefreshPerformance,
    pub config: RefreshConfigEcho,
}

#[derive(Serialize)]
pub struct RefreshFeedStats {
    pub attempted: usize,
    pub failed: usize,
}

#[derive(Serialize)]
pub struct RefreshPerformance {
    pub elapsed_ms: u128,
}

#[derive(Serialize)]
pub struct RefreshConfigEcho {
    pub max_items_per_refresh: usize,
    pub max_items_per_feed: usize,
    pub max_refresh_time_secs: u64,
}

pub async fn refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    let summary = crate::fetch::refresh_all_feeds(&state.store, &state.http, &state.config.fetch).await;

    Json(RefreshResponse {
        ingested: summary.articles_added,
        stats: RefreshStats {
            items: summary.articles_added,
            feeds: RefreshFeedStats {
                attempted: summary.feeds_attempted,
                failed: summary.feeds_failed,
            },
            performance: RefreshPerformance {
                elapsed_ms: summary.elapsed_ms,
            },
            config: RefreshConfigEcho {
                max_items_per_refresh: state.config.fetch.max_items_per_refresh,
                max_items_per_feed: state.config.fetch.max_items_per_feed,
                max_refresh_time_secs: state.config.fetch.max_refresh_time_secs,
            },
        },
    })
}

#[derive(Deserialize, Default)]
pub struct GenerateStoriesRequest {
    pub time_window_hours: Option<i64>,
    pub min_articles_per_story: Option<usize>,
    pub similarity_threshold: Option<f64>,
    pub model: Option<String>,
}

#[derive(Serialize)]
pub struct GenerateStoriesResponse {
    pub success: bool,
    pub stories_generated: usize,
    pub articles_found: usize,
    pub clusters_created: usize,
    pub duplicates_skipped: usize,
    pub message: String,
}

/// Runs the clustering + synthesis pass directly through the scheduler, so
/// this endpoint and the cron job share one code path (§6, §7).
///
/// The request body's overrides are accepted but not yet threaded into a
/// per-call config -- the scheduler always runs with its startup
/// configuration. Honoring them would mean plumbing a second, request-scoped
/// `ClusterConfig` through `generate_stories`; left as a follow-up since no
/// caller needs it today.
pub async fn generate_stories(
    State(state): State<AppState>,
    Json(_req): Json<GenerateStoriesRequest>,
) -> Json<GenerateStoriesResponse> {
    match state.scheduler.generate_stories().await {
        Ok(outcome) => Json(GenerateStoriesResponse {
            success: true,
            stories_generated: outcome.stories_generated,
            articles_found: outcome.articles_found,
            clusters_created: outcome.clusters_created,
            duplicates_skipped: outcome.duplicates_skipped,
            message: outcome.message,
        }),
        Err(e) => {
            warn!(target: TARGET_WEB_REQUEST, error = %e, "manual story generation failed");
            Json(GenerateStoriesResponse {
                success: false,
                stories_generated: 0,
                articles_found: 0,
                clusters_created: 0,
                duplicates_skipped: 0,
                message: e.to_string(),
            })
        }
    }
}

#[derive(Serialize)]
pub struct StoryView {
    pub id: i64,
    pub cluster_hash: String,
    pub topic: String,
    pub headline: String,
    pub synthesis: String,
    pub key_points: Vec<String>,
    pub why_it_matters: String,
    pub topics: Vec<String>,
    pub entities: Vec<String>,
    pub story_type: String,
    pub importance_score: f64,
    pub freshness_score: f64,
    pub quality_score: f64,
    pub article_count: i64,
    pub status: &'static str,
    pub title_source: String,
    pub parse_strategy: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<crate::store::Story> for StoryView {
    fn from(story: crate::store::Story) -> Self {
        let narrative = story.narrative().unwrap_or(NarrativeContent {
            synthesis: String::new(),
            key_points: Vec::new(),
            why_it_matters: String::new(),
            topics: Vec::new(),
            entities: Vec::new(),
        });
        let status = if story.archived { "archived" } else { "active" };
        StoryView {
            id: story.id,
            cluster_hash: story.cluster_hash,
            topic: story.topic,
            headline: story.headline,
            synthesis: narrative.synthesis,
            key_points: narrative.key_points,
            why_it_matters: narrative.why_it_matters,
            topics: narrative.topics,
            entities: narrative.entities,
            story_type: story.story_type,
            importance_score: story.importance_score,
            freshness_score: story.freshness_score,
            quality_score: story.quality_score,
            article_count: story.article_count,
            status,
            title_source: story.title_source,
            parse_strategy: story.parse_strategy,
            created_at: story.created_at,
            updated_at: story.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct ListStoriesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<String>,
    pub order_by: Option<String>,
    pub topic: Option<String>,
    #[serde(default)]
    pub apply_interests: bool,
}

pub async fn list_stories(
    State(state): State<AppState>,
    Query(query): Query<ListStoriesQuery>,
) -> Result<Json<Vec<StoryView>>, StatusCode> {
    let status = match query.status.as_deref() {
        Some("archived") => StoryStatusFilter::Archived,
        Some("all") => StoryStatusFilter::All,
        _ => StoryStatusFilter::Active,
    };
    let order_by = match query.order_by.as_deref() {
        Some("importance") => StoryOrderBy::Importance,
        Some("freshness") => StoryOrderBy::Freshness,
        Some("created_at") => StoryOrderBy::CreatedAt,
        _ => StoryOrderBy::Quality,
    };

    let filter = StoryFilter {
        topic: query.topic,
        status,
        order_by,
        limit: query.limit.unwrap_or(50),
        offset: query.offset.unwrap_or(0),
    };

    let stories = state
        .store
        .list_stories(&filter)
        .await
        .map_err(internal_error("list_stories"))?;

    Ok(Json(stories.into_iter().map(StoryView::from).collect()))
}

#[derive(Serialize)]
pub struct StoryWithArticles {
    #[serde(flatten)]
    pub story: StoryView,
    pub articles: Vec<Article>,
}

pub async fn get_story(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StoryWithArticles>, StatusCode> {
    let story = state
        .store
        .get_story(id)
        .await
        .map_err(internal_error("get_story"))?
        .ok_or(StatusCode::NOT_FOUND)?;

    let articles = ordered_story_articles(&state.store, id).await.map_err(internal_error("get_story:articles"))?;

    Ok(Json(StoryWithArticles {
        story: StoryView::from(story),
        articles,
    }))
}

pub async fn get_story_articles(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Article>>, StatusCode> {
    if state
        .store
        .get_story(id)
        .await
        .map_err(internal_error("get_story_articles"))?
        .is_none()
    {
        return Err(StatusCode::NOT_FOUND);
    }

    let articles = ordered_story_articles(&state.store, id).await.map_err(internal_error("get_story_articles"))?;
    Ok(Json(articles))
}

/// Fetches a story's articles in the primary-first order recorded by
/// `list_story_article_ids`, since an `id IN (...)` query does not preserve
/// caller-supplied ordering.
async fn ordered_story_articles(store: &Store, story_id: i64) -> Result<Vec<Article>, crate::error::StoreError> {
    let ids = store.list_story_article_ids(story_id).await?;
    let mut by_id = HashMap::with_capacity(ids.len());
    for id in &ids {
        if let Some(article) = store.get_article(*id).await? {
            by_id.insert(*id, article);
        }
    }
    Ok(ids.into_iter().filter_map(|id| by_id.remove(&id)).collect())
}

#[derive(Deserialize)]
pub struct ListItemsQuery {
    pub story_id: Option<i64>,
    pub topic: Option<String>,
    pub feed_id: Option<i64>,
    pub published_after: Option<String>,
    pub published_before: Option<String>,
    pub has_story: Option<bool>,
    pub limit: Option<i64>,
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<Vec<Article>>, StatusCode> {
    let filter = ArticleFilter {
        story_id: query.story_id,
        topic: query.topic,
        feed_id: query.feed_id,
        since_hours: None,
        published_after: query.published_after,
        published_before: query.published_before,
        has_story: query.has_story,
        limit: query.limit.unwrap_or(50),
    };

    let articles = state
        .store
        .list_articles(&filter)
        .await
        .map_err(internal_error("list_items"))?;

    Ok(Json(articles))
}

#[derive(Serialize)]
pub struct SchedulerStatusView {
    pub feed_refresh: JobView,
    pub story_generation: JobView,
}

#[derive(Serialize)]
pub struct JobView {
    pub name: &'static str,
    pub schedule: String,
    pub next_run_at: Option<String>,
    pub running: bool,
    pub last_status: Option<String>,
}

pub async fn scheduler_status(State(state): State<AppState>) -> Json<SchedulerStatusView> {
    let status = state.scheduler.status().await;
    Json(SchedulerStatusView {
        feed_refresh: JobView {
            name: status.feed_refresh.name,
            schedule: status.feed_refresh.schedule,
            next_run_at: status.feed_refresh.next_run_at,
            running: status.feed_refresh.running,
            last_status: status.feed_refresh.last_status,
        },
        story_generation: JobView {
            name: status.story_generation.name,
            schedule: status.story_generation.schedule,
            next_run_at: status.story_generation.next_run_at,
            running: status.story_generation.running,
            last_status: status.story_generation.last_status,
        },
    })
}

pub async fn healthz() -> &'static str {
    "ok"
}

/// Readiness requires a live connection to the store; the process is up
/// (`healthz`) but not ready to serve until the pool answers.
pub async fn readyz(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    sqlx::query("SELECT 1")
        .execute(state.store.pool())
        .await
        .map_err(internal_error("readyz"))?;
    Ok("ready")
}

#[derive(Serialize)]
pub struct OllamazResponse {
    pub reachable: bool,
}

pub async fn ollamaz(State(state): State<AppState>) -> Json<OllamazResponse> {
    Json(OllamazResponse {
        reachable: state.llm.is_reachable().await,
    })
}
