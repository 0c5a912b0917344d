//! Four-strategy JSON extraction chain for LLM completions (§4.2).
//!
//! Models are asked for JSON but rarely return only JSON: the response may
//! be fenced in a markdown code block, wrapped in prose, or malformed. Each
//! strategy is tried in order; the first success wins and is recorded.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::LlmError;
use crate::TARGET_LLM_REQUEST;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    Direct,
    MarkdownBlock,
    BraceMatch,
    Repair,
}

impl ParseStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseStrategy::Direct => "direct",
            ParseStrategy::MarkdownBlock => "markdown_block",
            ParseStrategy::BraceMatch => "brace_match",
            ParseStrategy::Repair => "repair",
        }
    }
}

/// Runs the four strategies in order and returns the first one that
/// deserializes into `T`, along with which strategy succeeded.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<(T, ParseStrategy), LlmError> {
    if let Ok(value) = serde_json::from_str::<T>(raw.trim()) {
        return Ok((value, ParseStrategy::Direct));
    }

    if let Some(block) = extract_markdown_block(raw) {
        if let Ok(value) = serde_json::from_str::<T>(&block) {
            return Ok((value, ParseStrategy::MarkdownBlock));
        }
    }

    if let Some(braced) = extract_outermost_braces(raw) {
        if let Ok(value) = serde_json::from_str::<T>(&braced) {
            return Ok((value, ParseStrategy::BraceMatch));
        }
        if let Some(repaired) = repair_json(&braced) {
            if let Ok(value) = serde_json::from_str::<T>(&repaired) {
                return Ok((value, ParseStrategy::Repair));
            }
        }
    }

    if let Some(repaired) = repair_json(raw) {
        if let Ok(value) = serde_json::from_str::<T>(&repaired) {
            return Ok((value, ParseStrategy::Repair));
        }
    }

    debug!(target: TARGET_LLM_REQUEST, raw_len = raw.len(), "all JSON parse strategies failed");
    Err(LlmError::BadResponse)
}

fn extract_markdown_block(raw: &str) -> Option<String> {
    let start_marker = raw.find("```json").map(|i| i + 7).or_else(|| raw.find("```").map(|i| i + 3))?;
    let rest = &raw[start_marker..];
    let end = rest.find("```")?;
    Some(rest[..end].trim().to_string())
}

/// Byte-depth brace counting that ignores braces inside string literals, so
/// a `{` or `}` quoted in a JSON string value (e.g. a code snippet the model
/// is summarizing) doesn't desync the match.
fn extract_outermost_braces(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let start = raw.find(['{', '['])?;
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match *byte {
            b'"' => in_string = true,
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(raw[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Best-effort repair for the common failure modes models actually produce:
/// trailing commas, raw newlines inside string values, and single-quoted
/// keys. Not a general JSON5 parser. Each pass is independent; the result is
/// returned only if at least one pass changed something.
fn repair_json(raw: &str) -> Option<String> {
    let mut repaired = escape_newlines_in_strings(raw);
    repaired = single_quoted_keys_to_double(&repaired);
    let no_trailing_commas = regex::Regex::new(r",\s*([}\]])").ok()?;
    repaired = no_trailing_commas.replace_all(&repaired, "$1").to_string();

    if repaired == raw {
        None
    } else {
        Some(repaired)
    }
}

/// Models sometimes emit a literal newline byte inside a string value
/// instead of `\n`; JSON forbids that, so escape it in place.
fn escape_newlines_in_strings(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    for ch in raw.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(ch);
                continue;
            }
            match ch {
                '\\' => {
                    escaped = true;
                    out.push(ch);
                }
                '"' => {
                    in_string = false;
                    out.push(ch);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                _ => out.push(ch),
            }
        } else {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
        }
    }
    out
}

/// Rewrites `'key':` to `"key":`; JSON5-style single-quoted object keys are
/// a common small-model mistake.
fn single_quoted_keys_to_double(raw: &str) -> String {
    let single_quoted_key = regex::Regex::new(r"'([^'\n]+)'(\s*:)").expect("valid regex");
    single_quoted_key.replace_all(raw, "\"$1\"$2").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Doc {
        a: i32,
    }

    #[test]
    fn direct_json_parses() {
        let (doc, strategy) = parse_json::<Doc>(r#"{"a": 1}"#).unwrap();
        assert_eq!(doc, Doc { a: 1 });
        assert_eq!(strategy, ParseStrategy::Direct);
    }

    #[test]
    fn markdown_fenced_json_parses() {
        let raw = "Sure, here is the JSON:\n```json\n{\"a\": 2}\n```\nLet me know.";
        let (doc, strategy) = parse_json::<Doc>(raw).unwrap();
        assert_eq!(doc, Doc { a: 2 });
        assert_eq!(strategy, ParseStrategy::MarkdownBlock);
    }

    #[test]
    fn prose_wrapped_braces_parse() {
        let raw = "The answer is {\"a\": 3} as requested.";
        let (doc, strategy) = parse_json::<Doc>(raw).unwrap();
        assert_eq!(doc, Doc { a: 3 });
        assert_eq!(strategy, ParseStrategy::BraceMatch);
    }

    #[test]
    fn trailing_comma_is_repaired() {
        let raw = r#"{"a": 4,}"#;
        let (doc, strategy) = parse_json::<Doc>(raw).unwrap();
        assert_eq!(doc, Doc { a: 4 });
        assert_eq!(strategy, ParseStrategy::Repair);
    }

    #[test]
    fn garbage_fails_all_strategies() {
        let result = parse_json::<Doc>("not json at all");
        assert!(result.is_err());
    }

    #[test]
    fn brace_in_string_value_does_not_desync_match() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Snippet {
            code: String,
        }
        let raw = r#"Here: {"code": "fn main() { }"} done"#;
        let (doc, strategy) = parse_json::<Snippet>(raw).unwrap();
        assert_eq!(doc.code, "fn main() { }");
        assert_eq!(strategy, ParseStrategy::BraceMatch);
    }

    #[test]
    fn single_quoted_keys_are_repaired() {
        let raw = r#"{'a': 5}"#;
        let (doc, strategy) = parse_json::<Doc>(raw).unwrap();
        assert_eq!(doc, Doc { a: 5 });
        assert_eq!(strategy, ParseStrategy::Repair);
    }

    #[test]
    fn unescaped_newline_in_string_is_repaired() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Text {
            body: String,
        }
        let raw = "{\"body\": \"line one\nline two\"}";
        let (doc, strategy) = parse_json::<Text>(raw).unwrap();
        assert_eq!(doc.body, "line one\nline two");
        assert_eq!(strategy, ParseStrategy::Repair);
    }
}
