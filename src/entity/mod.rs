//! Entity extractor (C7): LLM call plus an `(article_id, model)`-keyed
//! cache, grounded on the teacher's `entity::extraction::extract_entities`
//! -- same prompt/parse/log shape, retargeted at the fixed five-category
//! vocabulary and cached through the store instead of a dedicated entity
//! repository table.

pub mod types;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::llm::{parse_json, LlmClient, LlmParams};
use crate::store::Store;
use crate::TARGET_LLM_REQUEST;
use types::EntitySet;

const MAX_PER_KIND: usize = EntitySet::MAX_PER_KIND;

pub async fn extract_entities(
    store: &Store,
    llm: &LlmClient,
    article_id: i64,
    article_text: &str,
    model: &str,
) -> Result<EntitySet> {
    if let Some(cached) = store
        .get_cached_entities(article_id, model)
        .await
        .context("entity cache lookup")?
    {
        debug!(target: TARGET_LLM_REQUEST, article_id, "entity cache hit");
        return Ok(cached);
    }

    let prompt = entity_extraction_prompt(article_text);
    let params = LlmParams {
        model: model.to_string(),
        temperature: 0.1,
    };

    let response = llm.complete(&prompt, &params).await?;
    let (mut entities, strategy): (EntitySet, _) = parse_json(&response)?;
    cap_buckets(&mut entities);

    info!(target: TARGET_LLM_REQUEST, strategy = strategy.as_str(), "entity extraction parsed");
    Ok(entities)
}

fn cap_buckets(entities: &mut EntitySet) {
    for kind in types::EntityKind::ALL {
        let bucket = entities.bucket_mut(kind);
        bucket.truncate(MAX_PER_KIND);
    }
}

fn entity_extraction_prompt(article_text: &str) -> String {
    format!(
        "Extract named entities from the article below. Return strict JSON only, \
         with five keys: companies, products, people, technologies, locations. \
         Each is a list of objects: {{\"name\": ..., \"confidence\": 0.0-1.0, \
         \"role\": \"primary_subject\" | \"mentioned\" | \"quoted\"}}. \
         Keep at most {} entities per category, ranked by relevance.\n\n\
         ARTICLE:\n{}",
        MAX_PER_KIND, article_text
    )
}
