//! Module-level configuration assembled once at startup from defaults plus
//! environment overrides (per DESIGN NOTES: no process-wide mutable globals;
//! the scheduler holds the only long-lived owner of this value).
//!
//! Follows the teacher's `environment.rs` style of small `env::var` reads
//! with explicit fallback-and-warn on parse failure, rather than a config
//! crate with implicit merging.

use std::env;
use std::str::FromStr;
use tracing::warn;

fn env_or<T: FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value for {}; using default", var);
            default
        }),
        Err(_) => default,
    }
}

fn env_or_string(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub max_items_per_refresh: usize,
    pub max_items_per_feed: usize,
    pub max_refresh_time_secs: u64,
    pub feed_worker_pool: usize,
}

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
    pub chunking_threshold: usize,
    pub chunk_size: usize,
    pub max_chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Clone, Debug)]
pub struct SimilarityWeights {
    pub keyword_weight: f64,
    pub entity_weight: f64,
    pub topic_weight: f64,
}

#[derive(Clone, Debug)]
pub struct ClusterConfig {
    pub time_window_hours: i64,
    pub min_articles_per_story: usize,
    pub similarity_threshold: f64,
    pub weights: SimilarityWeights,
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub feed_refresh_schedule: String,
    pub story_generation_schedule: String,
    pub timezone: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub default_model: String,
    pub story_model: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_path: String,
    pub http_port: u16,
    pub feed_urls: Vec<String>,
    pub fetch: FetchConfig,
    pub chunking: ChunkingConfig,
    pub cluster: ClusterConfig,
    pub scheduler: SchedulerConfig,
    pub llm: LlmConfig,
    pub story_archive_days: i64,
}

impl Config {
    /// Assembles configuration from defaults overridden by environment
    /// variables. Fails fast (per §7 "Configuration error") on a cron
    /// expression or weight sum that cannot possibly be valid.
    pub fn from_env() -> anyhow::Result<Self> {
        let weights = SimilarityWeights {
            keyword_weight: env_or("SIMILARITY_KEYWORD_WEIGHT", 0.3),
            entity_weight: env_or("SIMILARITY_ENTITY_WEIGHT", 0.5),
            topic_weight: env_or("SIMILARITY_TOPIC_WEIGHT", 0.2),
        };

        let config = Config {
            database_path: env_or_string("DATABASE_PATH", "newsloom.db"),
            http_port: env_or("PORT", 8080u16),
            feed_urls: env::var("FEED_URLS")
                .unwrap_or_default()
                .split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            fetch: FetchConfig {
                max_items_per_refresh: env_or("MAX_ITEMS_PER_REFRESH", 150),
                max_items_per_feed: env_or("MAX_ITEMS_PER_FEED", 50),
                max_refresh_time_secs: env_or("MAX_REFRESH_TIME_SECONDS", 300),
                feed_worker_pool: env_or("FEED_WORKER_POOL", 3),
            },
            chunking: ChunkingConfig {
                chunking_threshold: env_or("CHUNKING_THRESHOLD", 3000),
                chunk_size: env_or("CHUNK_SIZE", 1500),
                max_chunk_size: env_or("MAX_CHUNK_SIZE", 2000),
                chunk_overlap: env_or("CHUNK_OVERLAP", 200),
            },
            cluster: ClusterConfig {
                time_window_hours: env_or("STORY_TIME_WINDOW_HOURS", 24),
                min_articles_per_story: env_or("STORY_MIN_ARTICLES", 2),
                similarity_threshold: env_or("SIMILARITY_THRESHOLD", 0.25),
                weights,
            },
            scheduler: SchedulerConfig {
                feed_refresh_schedule: env_or_string("FEED_REFRESH_SCHEDULE", "0 30 5 * * *"),
                story_generation_schedule: env_or_string(
                    "STORY_GENERATION_SCHEDULE",
                    "0 0 6 * * *",
                ),
                timezone: env_or_string("SCHEDULER_TIMEZONE", "UTC"),
            },
            llm: LlmConfig {
                base_url: env_or_string("LLM_BASE_URL", "http://localhost:11434"),
                default_model: env_or_string("LLM_MODEL", "llama3.1"),
                story_model: env_or_string("STORY_MODEL", "llama3.1"),
            },
            story_archive_days: env_or("STORY_ARCHIVE_DAYS", 7),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        cron::Schedule::from_str(&self.scheduler.feed_refresh_schedule)
            .map_err(|e| anyhow::anyhow!("invalid feed_refresh_schedule cron string: {}", e))?;
        cron::Schedule::from_str(&self.scheduler.story_generation_schedule)
            .map_err(|e| anyhow::anyhow!("invalid story_generation_schedule cron string: {}", e))?;
        self.scheduler
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| anyhow::anyhow!("invalid scheduler_timezone: {}", e))?;

        let w = &self.cluster.weights;
        let sum = w.keyword_weight + w.entity_weight + w.topic_weight;
        if (sum - 1.0).abs() > 0.01 {
            anyhow::bail!(
                "similarity weights must sum to 1.0, got {} (keyword={}, entity={}, topic={})",
                sum,
                w.keyword_weight,
                w.entity_weight,
                w.topic_weight
            );
        }

        Ok(())
    }
}
