//! The LLM client (C2): a thin retrying wrapper over Ollama/OpenAI plus the
//! robust JSON-extraction chain every structured prompt relies on.

pub mod client;
pub mod parse;

pub use client::{LlmClient, LlmParams};
pub use parse::{parse_json, ParseStrategy};
