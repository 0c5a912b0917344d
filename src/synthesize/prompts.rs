//! Prompt templates for the four synthesis passes (§4.9), grounded on the
//! teacher's `prompt/common.rs` shared-instruction-block style.

pub const DONT_NARRATE: &str = r#"
Respond with the requested content only. Do not narrate your reasoning,
restate these instructions, or preface the answer with meta-commentary.
Return strict JSON where JSON is requested, with no surrounding prose.
"#;

pub fn type_detection_prompt(articles_text: &str) -> String {
    format!(
        "{instructions}\n\
         Classify this cluster of related articles into exactly one type: \
         breaking, evolving, trend, comparison. Return strict JSON: \
         {{\"story_type\": \"<one-of-the-above>\"}}.\n\n\
         ARTICLES:\n{articles}",
        instructions = DONT_NARRATE,
        articles = articles_text
    )
}

pub fn analysis_prompt(articles_text: &str) -> String {
    format!(
        "{instructions}\n\
         Analyze the cluster of related articles below. Return strict JSON: \
         {{\"timeline\": [\"<event>\", ...], \"core_facts\": [\"<fact>\", ...], \
         \"tensions\": [\"<tension>\", ...], \"key_players\": [\"<name>\", ...]}}.\n\n\
         ARTICLES:\n{articles}",
        instructions = DONT_NARRATE,
        articles = articles_text
    )
}

pub fn synthesis_prompt(story_type: &str, analysis_json: &str, articles_text: &str) -> String {
    let type_guidance = match story_type {
        "breaking" => "Lead with what just happened and why it matters right now.",
        "evolving" => "Trace how the situation has changed and what is still unresolved.",
        "trend" => "Frame the pattern across sources and why it is emerging now.",
        "comparison" => "Contrast the competing positions or offerings directly.",
        _ => "Present the most important facts clearly.",
    };

    format!(
        "{instructions}\n\
         Using the analysis and articles below, write a complete story. {guidance}\n\
         Return strict JSON: {{\"title\": ..., \"synthesis\": ..., \
         \"key_points\": [\"<point>\", ...] (3 to 8 items), \"why_it_matters\": ..., \
         \"topics\": [\"<topic>\", ...], \"entities\": [\"<name>\", ...]}}.\n\n\
         ANALYSIS:\n{analysis}\n\nARTICLES:\n{articles}",
        instructions = DONT_NARRATE,
        guidance = type_guidance,
        analysis = analysis_json,
        articles = articles_text
    )
}

pub fn refinement_prompt(draft_json: &str) -> String {
    format!(
        "{instructions}\n\
         Critique and polish the draft story below: tighten the prose, remove \
         redundancy, verify key_points are distinct and each contains a concrete \
         fact. Return the same JSON shape, refined.\n\n\
         DRAFT:\n{draft}",
        instructions = DONT_NARRATE,
        draft = draft_json
    )
}
