//! Summariser (C6): cache-first structured summarization, dispatching
//! between a single-shot prompt and a map-reduce pass over chunked text
//! once the article crosses the token threshold (§4.6).

pub mod chunk;
pub mod tokenize;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::LlmError;
use crate::llm::{parse_json, LlmClient, LlmParams};
use crate::store::types::StructuredSummary;
use crate::store::Store;
use crate::util::now_naive_iso;
use crate::TARGET_LLM_REQUEST;

/// The LLM's literal JSON contract for a summary (§3); `StructuredSummary`
/// wraps this with bookkeeping the caller fills in once it's satisfied.
#[derive(Deserialize)]
struct RawSummary {
    bullets: Vec<String>,
    why_it_matters: String,
    tags: Vec<String>,
}

/// Result of summarizing one article. `Fallback` is written when the LLM
/// backend was entirely unreachable: `structured_summary` is left null and
/// only a plain-text gloss is persisted (§4.6/§7).
pub enum SummaryOutcome {
    Structured(StructuredSummary),
    Fallback(String),
}

pub async fn summarize_article(
    store: &Store,
    llm: &LlmClient,
    content_hash: &str,
    title: &str,
    text: &str,
    topic: &str,
    model: &str,
    cfg: &ChunkingConfig,
) -> Result<SummaryOutcome> {
    if let Some(cached) = store
        .get_cached_summary(content_hash, model)
        .await
        .context("summary cache lookup")?
    {
        debug!(target: TARGET_LLM_REQUEST, content_hash, "summary cache hit");
        return Ok(SummaryOutcome::Structured(cached));
    }

    let token_count = tokenize::approx_token_count(text);
    let chunked = token_count > cfg.chunking_threshold;

    let result = if !chunked {
        summarize_direct(llm, title, text, model, topic).await.map(|raw| (raw, None))
    } else {
        summarize_map_reduce(llm, title, text, model, cfg, topic).await
    };

    match result {
        Ok((raw, chunk_count)) => {
            let summary = StructuredSummary {
                bullets: raw.bullets,
                why_it_matters: raw.why_it_matters,
                tags: raw.tags,
                processing_method: if chunked { "map_reduce" } else { "direct" }.to_string(),
                is_chunked: chunked,
                chunk_count: chunk_count.map(|c| c as i64),
                total_tokens: Some(token_count as i64),
                content_hash: content_hash.to_string(),
                model: model.to_string(),
                generated_at: now_naive_iso(),
            };
            Ok(SummaryOutcome::Structured(summary))
        }
        Err(LlmError::Unavailable) | Err(LlmError::Timeout) => {
            warn!(target: TARGET_LLM_REQUEST, content_hash, "LLM unavailable, writing fallback summary");
            Ok(SummaryOutcome::Fallback(fallback_summary_text(title, text)))
        }
        Err(LlmError::BadResponse) => {
            // summarize_direct/summarize_map_reduce absorb parse failures into
            // a degraded RawSummary internally and never surface BadResponse.
            unreachable!("summarization paths never propagate BadResponse")
        }
    }
}

/// Sends the prompt, retries once on a parse failure, and degrades to a
/// two-sentence extract if the retry also fails to parse. Only a backend
/// failure on the HTTP call itself (`Unavailable`/`Timeout`) is propagated.
async fn summarize_direct(
    llm: &LlmClient,
    title: &str,
    text: &str,
    model: &str,
    topic: &str,
) -> Result<RawSummary, LlmError> {
    let prompt = summary_prompt(title, text);
    let params = LlmParams {
        model: model.to_string(),
        temperature: 0.2,
    };

    let first = llm.complete(&prompt, &params).await?;
    if let Ok((summary, strategy)) = parse_json::<RawSummary>(&first) {
        info!(target: TARGET_LLM_REQUEST, strategy = strategy.as_str(), "direct summarization parsed");
        return Ok(summary);
    }

    warn!(target: TARGET_LLM_REQUEST, "direct summarization unparseable, retrying once");
    let second = llm.complete(&prompt, &params).await?;
    match parse_json::<RawSummary>(&second) {
        Ok((summary, strategy)) => {
            info!(target: TARGET_LLM_REQUEST, strategy = strategy.as_str(), "direct summarization parsed on retry");
            Ok(summary)
        }
        Err(_) => {
            warn!(target: TARGET_LLM_REQUEST, "direct summarization unparseable after retry, degrading");
            Ok(degraded_raw_summary(text, topic))
        }
    }
}

/// Summarizes each chunk independently, then reduces the per-chunk
/// summaries into one structured summary with a second LLM call. The
/// reduce step gets the same retry-once-then-degrade treatment as the
/// direct path.
async fn summarize_map_reduce(
    llm: &LlmClient,
    title: &str,
    text: &str,
    model: &str,
    cfg: &ChunkingConfig,
    topic: &str,
) -> Result<(RawSummary, Option<usize>), LlmError> {
    let chunks = chunk::chunk_text(text, cfg);
    info!(target: TARGET_LLM_REQUEST, chunk_count = chunks.len(), "map-reduce summarization started");

    let mut partials = Vec::with_capacity(chunks.len());
    for (index, chunk_text) in chunks.iter().enumerate() {
        let prompt = format!(
            "Summarize this excerpt (part {} of an article titled \"{}\") in 2-3 sentences, \
             preserving concrete facts, names, and numbers.\n\nEXCERPT:\n{}",
            index + 1,
            title,
            chunk_text
        );
        let params = LlmParams {
            model: model.to_string(),
            temperature: 0.2,
        };
        let partial = llm.complete(&prompt, &params).await?;
        partials.push(partial);
    }

    let combined = partials.join("\n");
    let reduce_prompt = reduce_prompt(title, &combined);
    let params = LlmParams {
        model: model.to_string(),
        temperature: 0.2,
    };

    let first = llm.complete(&reduce_prompt, &params).await?;
    if let Ok((summary, strategy)) = parse_json::<RawSummary>(&first) {
        info!(target: TARGET_LLM_REQUEST, strategy = strategy.as_str(), "map-reduce summarization parsed");
        return Ok((summary, Some(chunks.len())));
    }

    warn!(target: TARGET_LLM_REQUEST, "map-reduce reduce step unparseable, retrying once");
    let second = llm.complete(&reduce_prompt, &params).await?;
    match parse_json::<RawSummary>(&second) {
        Ok((summary, strategy)) => {
            info!(target: TARGET_LLM_REQUEST, strategy = strategy.as_str(), "map-reduce summarization parsed on retry");
            Ok((summary, Some(chunks.len())))
        }
        Err(_) => {
            warn!(target: TARGET_LLM_REQUEST, "map-reduce reduce step unparseable after retry, degrading");
            Ok((degraded_raw_summary(&combined, topic), Some(chunks.len())))
        }
    }
}

fn summary_prompt(title: &str, text: &str) -> String {
    format!(
        "Summarize the article below. Return strict JSON only: \
         {{\"bullets\": [\"<point>\", ... (3-5 items, each under 80 characters)], \
         \"why_it_matters\": \"<50-150 word explanation of significance>\", \
         \"tags\": [\"<kebab-case-tag>\", ... (3-6 items)]}}.\n\n\
         TITLE: {}\nBODY:\n{}",
        title, text
    )
}

fn reduce_prompt(title: &str, combined: &str) -> String {
    format!(
        "Combine these partial summaries of the article \"{}\" into one structured summary. \
         Return strict JSON only: \
         {{\"bullets\": [\"<point>\", ... (3-5 items, each under 80 characters)], \
         \"why_it_matters\": \"<50-150 word explanation of significance>\", \
         \"tags\": [\"<kebab-case-tag>\", ... (3-6 items)]}}.\n\n\
         PARTIAL SUMMARIES:\n{}",
        title, combined
    )
}

/// Built when the LLM responded but its output couldn't be parsed even
/// after a retry: the first two sentences of the source text stand in for
/// `why_it_matters`, and `topic` is the only tag (§4.6/§7).
fn degraded_raw_summary(text: &str, topic: &str) -> RawSummary {
    let gloss = first_two_sentences(text);
    RawSummary {
        bullets: vec![gloss.clone()],
        why_it_matters: gloss,
        tags: vec![topic.to_string()],
    }
}

/// Plain-text fallback written when the LLM backend itself was
/// unreachable -- no structured output is attempted at all (§4.6/§7).
fn fallback_summary_text(title: &str, text: &str) -> String {
    let gloss = first_two_sentences(text);
    if gloss.is_empty() {
        title.to_string()
    } else {
        gloss
    }
}

fn first_two_sentences(text: &str) -> String {
    text.unicode_sentences().take(2).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_raw_summary_uses_first_two_sentences() {
        let text = "First sentence here. Second sentence follows. Third is dropped.";
        let raw = degraded_raw_summary(text, "ai-ml");
        assert_eq!(raw.why_it_matters, "First sentence here. Second sentence follows.");
        assert_eq!(raw.tags, vec!["ai-ml".to_string()]);
    }

    #[test]
    fn fallback_summary_text_falls_back_to_title_when_text_is_empty() {
        assert_eq!(fallback_summary_text("A Title", ""), "A Title");
    }
}
