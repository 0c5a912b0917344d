//! Synthesiser (C9): four-pass LLM pipeline producing a complete Story from
//! one article cluster (§4.9), with a degraded fallback when synthesis
//! cannot be parsed after every strategy in [`crate::llm::parse`].

pub mod prompts;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::LlmError;
use crate::llm::{parse_json, LlmClient, LlmParams, ParseStrategy};
use crate::store::types::NarrativeContent;
use crate::store::Article;
use crate::TARGET_SYNTH;

pub struct SynthesisResult {
    pub title: String,
    pub narrative: NarrativeContent,
    pub story_type: String,
    pub title_source: &'static str,
    pub parse_strategy: &'static str,
}

#[derive(Deserialize)]
struct TypeDetection {
    story_type: String,
}

#[derive(Deserialize)]
struct FinalSynthesis {
    title: String,
    synthesis: String,
    key_points: Vec<String>,
    why_it_matters: String,
    topics: Vec<String>,
    entities: Vec<String>,
}

/// `None` means the cluster should be left untouched for the next scheduled
/// run: the LLM backend was unreachable, not that synthesis failed, so
/// retrying later with the same cluster is the right move rather than
/// persisting something degraded (§4.9/§7). A degraded story is written
/// only when the backend responded but its output could not be parsed by
/// any strategy.
pub async fn synthesize_story(
    llm: &LlmClient,
    model: &str,
    topic: &str,
    articles: &[Article],
) -> Option<SynthesisResult> {
    match run_pipeline(llm, model, articles).await {
        Ok(result) => Some(result),
        Err(LlmError::Unavailable) | Err(LlmError::Timeout) => {
            warn!(target: TARGET_SYNTH, "LLM unavailable, leaving cluster for the next run");
            None
        }
        Err(LlmError::BadResponse) => {
            warn!(target: TARGET_SYNTH, "synthesis response unparseable, writing degraded story");
            Some(degraded_story(topic, articles))
        }
    }
}

async fn run_pipeline(
    llm: &LlmClient,
    model: &str,
    articles: &[Article],
) -> Result<SynthesisResult, LlmError> {
    let articles_text = render_articles(articles);
    let params = LlmParams {
        model: model.to_string(),
        temperature: 0.3,
    };

    let type_response = llm.complete(&prompts::type_detection_prompt(&articles_text), &params).await?;
    let (type_detection, _): (TypeDetection, _) = parse_json(&type_response)?;

    let analysis_response = llm.complete(&prompts::analysis_prompt(&articles_text), &params).await?;
    let analysis_json = extract_json_text(&analysis_response);

    let draft_response = llm
        .complete(
            &prompts::synthesis_prompt(&type_detection.story_type, &analysis_json, &articles_text),
            &params,
        )
        .await?;

    let refined_response = llm.complete(&prompts::refinement_prompt(&draft_response), &params).await?;
    let (final_synthesis, strategy): (FinalSynthesis, _) = parse_json(&refined_response)?;

    info!(
        target: TARGET_SYNTH,
        story_type = %type_detection.story_type,
        strategy = strategy.as_str(),
        "synthesis pipeline complete"
    );

    Ok(SynthesisResult {
        title: final_synthesis.title,
        narrative: NarrativeContent {
            synthesis: final_synthesis.synthesis,
            key_points: final_synthesis.key_points,
            why_it_matters: final_synthesis.why_it_matters,
            topics: final_synthesis.topics,
            entities: final_synthesis.entities,
        },
        story_type: type_detection.story_type,
        title_source: "llm",
        parse_strategy: strategy_str(strategy),
    })
}

fn strategy_str(strategy: ParseStrategy) -> &'static str {
    strategy.as_str()
}

/// Best-effort pass-through: the chain-of-thought pass is free-form JSON
/// whose exact shape is not consumed structurally, only embedded as context
/// for the next prompt, so a parse failure here is not fatal.
fn extract_json_text(raw: &str) -> String {
    raw.to_string()
}

/// Prefers the structured `why_it_matters` line as the one-sentence gloss;
/// falls back to the degraded `fallback_summary` text, then the bare title.
fn one_line_summary(article: &Article) -> String {
    if let Some(summary) = article.summary() {
        return summary.why_it_matters;
    }
    article
        .fallback_summary
        .clone()
        .unwrap_or_else(|| article.title.clone())
}

fn render_articles(articles: &[Article]) -> String {
    articles
        .iter()
        .map(|a| format!("- {} ({})", a.title, one_line_summary(a)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Degraded Story per §4.9: fallback title, synthesis is a truncated
/// concatenation of article summaries, `why_it_matters` left empty.
fn degraded_story(topic: &str, articles: &[Article]) -> SynthesisResult {
    let first_entity = articles
        .iter()
        .find_map(|a| a.entities().and_then(|e| e.all_names().into_iter().next()))
        .unwrap_or_else(|| "developments".to_string());

    let title = format!("Update on {} and {}", first_entity, topic);

    let concatenated: String = articles
        .iter()
        .map(one_line_summary)
        .collect::<Vec<_>>()
        .join(" ");
    let synthesis: String = concatenated.chars().take(1500).collect();

    SynthesisResult {
        title: title.clone(),
        narrative: NarrativeContent {
            synthesis,
            key_points: Vec::new(),
            why_it_matters: String::new(),
            topics: vec![topic.to_string()],
            entities: Vec::new(),
        },
        story_type: "degraded".to_string(),
        title_source: "fallback",
        parse_strategy: "direct",
    }
}
