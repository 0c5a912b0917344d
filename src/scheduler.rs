//! Scheduler (C11): two cron-driven jobs with an overlap guard, cooperative
//! cancellation, and the ordering guarantee that `feed_refresh` completes
//! before `story_generation` when both fire close together (§4.11).
//!
//! Grounded on the teacher's worker-loop idiom (log start/stop at a
//! dedicated tracing target, `sleep` until the next unit of work) but
//! replaces the fixed-interval sleep with a cron-computed one, and the
//! informal shutdown coordination with `tokio_util::sync::CancellationToken`.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cluster::{self, CandidateCluster};
use crate::config::Config;
use crate::entity;
use crate::entity::types::entity_overlap;
use crate::llm::LlmClient;
use crate::score::{score_story, ScoreInputs};
use crate::store::types::ArticleFilter;
use crate::store::{JobStatus, MemberArticle, NewStory, Store};
use crate::summarize;
use crate::topic;
use crate::{extract, fetch, synthesize, TARGET_SCHED};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobName {
    FeedRefresh,
    StoryGeneration,
}

impl JobName {
    fn as_str(self) -> &'static str {
        match self {
            JobName::FeedRefresh => "feed_refresh",
            JobName::StoryGeneration => "story_generation",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobStatusView {
    pub name: &'static str,
    pub schedule: String,
    pub next_run_at: Option<String>,
    pub running: bool,
    pub last_status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub articles_found: usize,
    pub clusters_created: usize,
    pub duplicates_skipped: usize,
    pub stories_generated: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub feed_refresh: JobStatusView,
    pub story_generation: JobStatusView,
}

pub struct Scheduler {
    store: Store,
    llm: LlmClient,
    http: reqwest::Client,
    config: Config,
    cancel: CancellationToken,
    feed_refresh_lock: Arc<Mutex<()>>,
    story_generation_lock: Arc<Mutex<()>>,
}

impl Scheduler {
    pub fn new(store: Store, llm: LlmClient, http: reqwest::Client, config: Config) -> Arc<Self> {
        Arc::new(Scheduler {
            store,
            llm,
            http,
            config,
            cancel: CancellationToken::new(),
            feed_refresh_lock: Arc::new(Mutex::new(())),
            story_generation_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Starts both cron loops as background tasks. The returned handles let
    /// the caller await clean shutdown after cancelling.
    pub fn spawn(self: &Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let feed_refresh = {
            let this = Arc::clone(self);
            tokio::spawn(async move { this.cron_loop(JobName::FeedRefresh).await })
        };
        let story_generation = {
            let this = Arc::clone(self);
            tokio::spawn(async move { this.cron_loop(JobName::StoryGeneration).await })
        };
        vec![feed_refresh, story_generation]
    }

    pub fn cancel(&self) {
        info!(target: TARGET_SCHED, "scheduler cancellation requested");
        self.cancel.cancel();
    }

    fn schedule_for(&self, job: JobName) -> &str {
        match job {
            JobName::FeedRefresh => &self.config.scheduler.feed_refresh_schedule,
            JobName::StoryGeneration => &self.config.scheduler.story_generation_schedule,
        }
    }

    fn lock_for(&self, job: JobName) -> Arc<Mutex<()>> {
        match job {
            JobName::FeedRefresh => Arc::clone(&self.feed_refresh_lock),
            JobName::StoryGeneration => Arc::clone(&self.story_generation_lock),
        }
    }

    async fn cron_loop(self: Arc<Self>, job: JobName) {
        info!(target: TARGET_SCHED, job = job.as_str(), "scheduler loop started");

        let tz: Tz = self
            .config
            .scheduler
            .timezone
            .parse()
            .expect("timezone validated at startup");
        let schedule = Schedule::from_str(self.schedule_for(job)).expect("cron validated at startup");

        loop {
            let now = Utc::now().with_timezone(&tz);
            let next = match schedule.after(&now).next() {
                Some(next) => next,
                None => {
                    error!(target: TARGET_SCHED, job = job.as_str(), "cron schedule produced no next fire time");
                    return;
                }
            };

            let wait = (next.with_timezone(&Utc) - Utc::now())
                .to_std()
                .unwrap_or(StdDuration::from_secs(0));

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.cancel.cancelled() => {
                    info!(target: TARGET_SCHED, job = job.as_str(), "scheduler loop cancelled while waiting");
                    return;
                }
            }

            self.run_job(job).await;
        }
    }

    /// Runs one job, enforcing the overlap guard and (for `story_generation`)
    /// waiting for any in-flight `feed_refresh` to finish first.
    pub async fn run_job(self: &Arc<Self>, job: JobName) {
        if job == JobName::StoryGeneration {
            // Ordering guarantee: feed_refresh completes before story_generation.
            let _ = self.feed_refresh_lock.lock().await;
        }

        let lock = self.lock_for(job);
        let guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(target: TARGET_SCHED, job = job.as_str(), "previous run still in progress, skipping this firing");
                if let Ok(id) = self.store.start_job(job.as_str()).await {
                    let _ = self.store.finish_job(id, JobStatus::Skipped, Some("overlap guard")).await;
                }
                return;
            }
        };

        let job_id = match self.store.start_job(job.as_str()).await {
            Ok(id) => id,
            Err(e) => {
                error!(target: TARGET_SCHED, job = job.as_str(), error = %e, "failed to record job start");
                return;
            }
        };

        info!(target: TARGET_SCHED, job = job.as_str(), job_id, "job started");

        let outcome = tokio::select! {
            result = self.execute(job) => result,
            _ = self.cancel.cancelled() => {
                warn!(target: TARGET_SCHED, job = job.as_str(), job_id, "job cancelled");
                let _ = self.store.finish_job(job_id, JobStatus::Cancelled, None).await;
                drop(guard);
                return;
            }
        };

        match outcome {
            Ok(detail) => {
                info!(target: TARGET_SCHED, job = job.as_str(), job_id, detail = %detail, "job finished");
                let _ = self.store.finish_job(job_id, JobStatus::Success, Some(&detail)).await;
            }
            Err(e) => {
                error!(target: TARGET_SCHED, job = job.as_str(), job_id, error = %e, "job failed");
                let _ = self.store.finish_job(job_id, JobStatus::Failed, Some(&e.to_string())).await;
            }
        }

        drop(guard);
    }

    async fn execute(&self, job: JobName) -> anyhow::Result<String> {
        match job {
            JobName::FeedRefresh => self.execute_feed_refresh().await,
            JobName::StoryGeneration => self.execute_story_generation().await,
        }
    }

    async fn execute_feed_refresh(&self) -> anyhow::Result<String> {
        let summary = fetch::refresh_all_feeds(&self.store, &self.http, &self.config.fetch).await;
        Ok(format!(
            "attempted={} failed={} articles_added={}",
            summary.feeds_attempted, summary.feeds_failed, summary.articles_added
        ))
    }

    async fn execute_story_generation(&self) -> anyhow::Result<String> {
        let outcome = self.generate_stories().await?;
        Ok(outcome.message.clone())
    }

    /// Runs the clustering + synthesis pass directly, without the overlap
    /// guard or job bookkeeping `run_job` applies -- used both by the cron
    /// loop and by a manual `POST /stories/generate` trigger.
    pub async fn generate_stories(&self) -> anyhow::Result<GenerationOutcome> {
        self.enrich_pending_articles().await?;

        let articles = self
            .store
            .list_ready_for_clustering(self.config.cluster.time_window_hours)
            .await?;

        if articles.is_empty() {
            return Ok(GenerationOutcome {
                articles_found: 0,
                clusters_created: 0,
                duplicates_skipped: 0,
                stories_generated: 0,
                message: "No new articles in the clustering window. Try fetching or expanding window.".to_string(),
            });
        }

        let existing_hashes: std::collections::HashSet<String> = self
            .store
            .list_active_story_cluster_hashes(self.config.cluster.time_window_hours)
            .await?
            .into_iter()
            .collect();

        let all_candidates = cluster::candidate_count(&articles, &self.config.cluster);
        let clusters = cluster::cluster_articles(&articles, &self.config.cluster, &existing_hashes);
        let duplicates_skipped = all_candidates.saturating_sub(clusters.len());

        if all_candidates == 0 {
            return Ok(GenerationOutcome {
                articles_found: articles.len(),
                clusters_created: 0,
                duplicates_skipped: 0,
                stories_generated: 0,
                message: format!(
                    "Found {} articles, no clusters formed. Try adjusting threshold or minimum articles.",
                    articles.len()
                ),
            });
        }

        if clusters.is_empty() {
            return Ok(GenerationOutcome {
                articles_found: articles.len(),
                clusters_created: 0,
                duplicates_skipped: all_candidates,
                stories_generated: 0,
                message: format!(
                    "All {} story clusters were duplicates of existing stories. Up to date.",
                    all_candidates
                ),
            });
        }

        let clusters_created = clusters.len();
        let mut generated = 0;

        for candidate in clusters {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.synthesize_and_store(candidate, &articles).await {
                Ok(true) => generated += 1,
                Ok(false) => {}
                Err(e) => warn!(target: TARGET_SCHED, error = %e, "story synthesis failed for cluster"),
            }
        }

        let archived = self
            .store
            .archive_stories_older_than(self.config.story_archive_days)
            .await?;
        info!(target: TARGET_SCHED, archived, "archived stale stories");

        Ok(GenerationOutcome {
            articles_found: articles.len(),
            clusters_created,
            duplicates_skipped,
            stories_generated: generated,
            message: format!(
                "Successfully generated {} new stories ({} duplicates skipped).",
                generated, duplicates_skipped
            ),
        })
    }

    async fn synthesize_and_store(
        &self,
        candidate: CandidateCluster,
        all_articles: &[crate::store::Article],
    ) -> anyhow::Result<bool> {
        let members: Vec<_> = all_articles
            .iter()
            .filter(|a| candidate.article_ids.contains(&a.id))
            .cloned()
            .collect();

        let Some(result) = synthesize::synthesize_story(
            &self.llm,
            &self.config.llm.story_model,
            &candidate.topic,
            &members,
        )
        .await
        else {
            // LLM unavailable: leave this cluster alone, a later scheduled
            // run will retry it from scratch.
            return Ok(false);
        };

        let entity_count: usize = members
            .iter()
            .filter_map(|a| a.entities())
            .map(|e| e.all_names().len())
            .sum();
        let unique_sources: usize = members
            .iter()
            .map(|a| a.feed_id)
            .collect::<std::collections::HashSet<_>>()
            .len();
        let published: Vec<_> = members
            .iter()
            .filter_map(|a| crate::util::from_naive_iso(&a.published))
            .collect();

        let mut health_scores = Vec::with_capacity(unique_sources);
        for feed_id in members.iter().map(|a| a.feed_id).collect::<std::collections::HashSet<_>>() {
            if let Ok(score) = self.store.feed_health_score(feed_id).await {
                health_scores.push(score);
            }
        }

        let score = score_story(
            &ScoreInputs {
                article_count: members.len(),
                unique_source_count: unique_sources,
                entity_count,
                published_at: &published,
                feed_health_scores: &health_scores,
            },
            Utc::now(),
        );

        let narrative_json = serde_json::to_string(&result.narrative)?;
        let members = Self::rank_members(&members);

        let new_story = NewStory {
            cluster_hash: &candidate.cluster_hash,
            topic: &candidate.topic,
            headline: &result.title,
            narrative_json: &narrative_json,
            story_type: &result.story_type,
            importance_score: score.importance,
            freshness_score: score.freshness,
            quality_score: score.quality,
            title_source: result.title_source,
            parse_strategy: result.parse_strategy,
            members: &members,
        };

        match self.store.create_story(&new_story).await {
            Ok(_) => Ok(true),
            Err(crate::error::StoreError::AlreadyExists) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Chooses a primary article (most entities, earliest published as
    /// tiebreak) and scores the rest by entity overlap against it (§3
    /// "Primary article").
    fn rank_members(members: &[crate::store::Article]) -> Vec<MemberArticle> {
        let primary_index = members
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                let a_count = a.entities().map(|e| e.all_names().len()).unwrap_or(0);
                let b_count = b.entities().map(|e| e.all_names().len()).unwrap_or(0);
                a_count
                    .cmp(&b_count)
                    .then_with(|| b.published.cmp(&a.published))
            })
            .map(|(index, _)| index)
            .unwrap_or(0);

        let primary_entities = members[primary_index].entities().unwrap_or_default();

        members
            .iter()
            .enumerate()
            .map(|(index, article)| {
                if index == primary_index {
                    MemberArticle {
                        article_id: article.id,
                        primary: true,
                        relevance: 1.0,
                    }
                } else {
                    let entities = article.entities().unwrap_or_default();
                    MemberArticle {
                        article_id: article.id,
                        primary: false,
                        relevance: entity_overlap(&entities, &primary_entities),
                    }
                }
            })
            .collect()
    }

    /// Fills in topic/summary/entities for articles that were fetched but
    /// not yet enriched, bounded by the configured LLM concurrency (§5).
    async fn enrich_pending_articles(&self) -> anyhow::Result<()> {
        let filter = ArticleFilter {
            since_hours: Some(self.config.cluster.time_window_hours),
            limit: self.config.fetch.max_items_per_refresh as i64,
            ..Default::default()
        };
        let articles = self.store.list_articles(&filter).await?;

        for article in articles {
            if self.cancel.is_cancelled() {
                break;
            }
            if article.topic.is_some() && article.summary_json.is_some() && article.entities_json.is_some() {
                continue;
            }
            if let Err(e) = self.enrich_one(&article).await {
                warn!(target: TARGET_SCHED, article_id = article.id, error = %e, "article enrichment failed");
            }
        }
        Ok(())
    }

    async fn enrich_one(&self, article: &crate::store::Article) -> anyhow::Result<()> {
        let text = match &article.extracted_text {
            Some(text) => text.clone(),
            None => {
                let extracted = extract::extract_article(&article.url).await?;
                let hash = crate::util::content_hash(&extracted.text);
                self.store.set_article_text(article.id, &hash, &extracted.text).await?;
                extracted.text
            }
        };
        let content_hash = article
            .content_hash
            .clone()
            .unwrap_or_else(|| crate::util::content_hash(&text));

        let (topic, confidence) =
            topic::classify(&self.llm, &self.config.llm.default_model, &article.title, &text).await;
        self.store.set_article_topic(article.id, &topic.to_string(), confidence).await?;

        let outcome = summarize::summarize_article(
            &self.store,
            &self.llm,
            &content_hash,
            &article.title,
            &text,
            &topic.to_string(),
            &self.config.llm.default_model,
            &self.config.chunking,
        )
        .await?;
        match outcome {
            summarize::SummaryOutcome::Structured(summary) => {
                self.store
                    .set_article_summary(article.id, &summary, &self.config.llm.default_model)
                    .await?;
            }
            summarize::SummaryOutcome::Fallback(text) => {
                self.store.set_article_fallback_summary(article.id, &text).await?;
            }
        }

        let entities = entity::extract_entities(
            &self.store,
            &self.llm,
            article.id,
            &text,
            &self.config.llm.default_model,
        )
        .await?;
        self.store
            .set_article_entities(article.id, &entities, &self.config.llm.default_model)
            .await?;

        Ok(())
    }

    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            feed_refresh: self.job_status_view(JobName::FeedRefresh).await,
            story_generation: self.job_status_view(JobName::StoryGeneration).await,
        }
    }

    async fn job_status_view(&self, job: JobName) -> JobStatusView {
        let running = self.lock_for(job).try_lock().is_err();
        let last = self.store.last_job(job.as_str()).await.ok().flatten();
        let next_run_at = self.next_run_at(job);

        JobStatusView {
            name: job.as_str(),
            schedule: self.schedule_for(job).to_string(),
            next_run_at,
            running,
            last_status: last.map(|j| j.status),
        }
    }

    fn next_run_at(&self, job: JobName) -> Option<String> {
        let tz: Tz = self.config.scheduler.timezone.parse().ok()?;
        let schedule = Schedule::from_str(self.schedule_for(job)).ok()?;
        let now = Utc::now().with_timezone(&tz);
        schedule
            .after(&now)
            .next()
            .map(|next| crate::util::to_naive_iso(next.with_timezone(&Utc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::types::{EntityBucket, EntitySet, EntityWithMeta};

    fn article_with_entities(id: i64, published: &str, names: &[&str]) -> crate::store::Article {
        let mut entities = EntitySet::default();
        entities.companies = EntityBucket(
            names
                .iter()
                .map(|name| EntityWithMeta {
                    name: name.to_string(),
                    confidence: 0.8,
                    role: Default::default(),
                    disambiguation: None,
                })
                .collect(),
        );

        crate::store::Article {
            id,
            feed_id: 1,
            url: format!("https://example.test/{}", id),
            title: format!("article {}", id),
            published: published.to_string(),
            content_hash: None,
            extracted_text: None,
            summary_json: None,
            summary_model: None,
            fallback_summary: None,
            entities_json: Some(serde_json::to_string(&entities).unwrap()),
            entities_model: None,
            topic: Some("ai-ml".to_string()),
            topic_confidence: Some(1.0),
            ranking_score: names.len() as f64,
            created_at: published.to_string(),
        }
    }

    #[test]
    fn primary_is_the_article_with_the_most_entities() {
        let members = vec![
            article_with_entities(1, "2026-07-28T01:00:00", &["acme"]),
            article_with_entities(2, "2026-07-28T02:00:00", &["acme", "globex", "initech"]),
        ];
        let ranked = Scheduler::rank_members(&members);
        let primary = ranked.iter().find(|m| m.primary).expect("one primary");
        assert_eq!(primary.article_id, 2);
        assert_eq!(primary.relevance, 1.0);
    }

    #[test]
    fn tied_entity_counts_break_toward_earliest_published() {
        let members = vec![
            article_with_entities(1, "2026-07-28T05:00:00", &["acme"]),
            article_with_entities(2, "2026-07-28T01:00:00", &["acme"]),
        ];
        let ranked = Scheduler::rank_members(&members);
        let primary = ranked.iter().find(|m| m.primary).expect("one primary");
        assert_eq!(primary.article_id, 2);
    }

    #[test]
    fn non_primary_relevance_reflects_entity_overlap_with_primary() {
        let members = vec![
            article_with_entities(1, "2026-07-28T01:00:00", &["acme", "globex"]),
            article_with_entities(2, "2026-07-28T02:00:00", &["acme"]),
        ];
        let ranked = Scheduler::rank_members(&members);
        let secondary = ranked.iter().find(|m| !m.primary).expect("one non-primary");
        assert!(secondary.relevance > 0.0 && secondary.relevance < 1.0);
    }
}
