//! LLM completion with retry/backoff, grounded on the teacher's
//! `generate_llm_response` (same Ollama/OpenAI split, same exponential
//! backoff shape) generalized from per-worker logging to per-call logging
//! and trimmed to 3 retries / 120s timeout per §4.2/§5.

use async_openai::types::CreateCompletionRequestArgs;
use async_openai::Client as OpenAiClient;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

use crate::error::LlmError;
use crate::TARGET_LLM_REQUEST;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub enum LlmClient {
    Ollama(Ollama),
    OpenAi(OpenAiClient<async_openai::config::OpenAIConfig>),
}

#[derive(Clone, Debug)]
pub struct LlmParams {
    pub model: String,
    pub temperature: f32,
}

impl LlmClient {
    pub fn ollama(base_url: &str) -> Self {
        let url = url::Url::parse(base_url).expect("LLM_BASE_URL must be a valid URL");
        let host = format!(
            "{}://{}",
            url.scheme(),
            url.host_str().unwrap_or("localhost")
        );
        let port = url.port().unwrap_or(11434);
        LlmClient::Ollama(Ollama::new(host, port))
    }

    /// Sends `prompt` to the configured backend, retrying transient
    /// failures with exponential backoff (2s, 4s, 8s) before giving up.
    /// `LlmError::BadResponse` is never retried -- it means the model
    /// rejected the request or the backend returned something malformed,
    /// not that the backend is momentarily down, so another attempt with
    /// the same prompt would just fail the same way (§4.2/§5).
    pub async fn complete(&self, prompt: &str, params: &LlmParams) -> Result<String, LlmError> {
        let mut backoff = Duration::from_secs(2);

        for attempt in 0..MAX_RETRIES {
            let outcome = self.complete_once(prompt, params).await;
            match outcome {
                Ok(text) => {
                    debug!(target: TARGET_LLM_REQUEST, model = %params.model, attempt, "LLM completion succeeded");
                    return Ok(text);
                }
                Err(LlmError::BadResponse) => {
                    warn!(target: TARGET_LLM_REQUEST, model = %params.model, attempt, "LLM rejected the request, not retrying");
                    return Err(LlmError::BadResponse);
                }
                Err(e) => {
                    warn!(target: TARGET_LLM_REQUEST, model = %params.model, attempt, error = %describe(&e), "LLM completion attempt failed");
                }
            }

            if attempt + 1 < MAX_RETRIES {
                sleep(backoff).await;
                backoff *= 2;
            }
        }

        error!(target: TARGET_LLM_REQUEST, model = %params.model, "LLM completion failed after {} retries", MAX_RETRIES);
        Err(LlmError::Unavailable)
    }

    /// Cheap reachability probe for `GET /ollamaz`: lists models instead of
    /// running a completion, bounded by a short timeout rather than the
    /// full request budget.
    pub async fn is_reachable(&self) -> bool {
        const PROBE_TIMEOUT_SECS: u64 = 5;
        match self {
            LlmClient::Ollama(ollama) => {
                timeout(Duration::from_secs(PROBE_TIMEOUT_SECS), ollama.list_local_models())
                    .await
                    .map(|r| r.is_ok())
                    .unwrap_or(false)
            }
            LlmClient::OpenAi(client) => {
                timeout(Duration::from_secs(PROBE_TIMEOUT_SECS), client.models().list())
                    .await
                    .map(|r| r.is_ok())
                    .unwrap_or(false)
            }
        }
    }

    async fn complete_once(&self, prompt: &str, params: &LlmParams) -> Result<String, LlmError> {
        match self {
            LlmClient::Ollama(ollama) => {
                let mut request =
                    GenerationRequest::new(params.model.clone(), prompt.to_string());
                request.options =
                    Some(GenerationOptions::default().temperature(params.temperature));

                match timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), ollama.generate(request))
                    .await
                {
                    Ok(Ok(response)) => Ok(response.response),
                    Ok(Err(_)) => Err(LlmError::Unavailable),
                    Err(_) => Err(LlmError::Timeout),
                }
            }
            LlmClient::OpenAi(client) => {
                let request = CreateCompletionRequestArgs::default()
                    .model(params.model.clone())
                    .prompt(prompt)
                    .temperature(params.temperature)
                    .build()
                    .map_err(|_| LlmError::BadResponse)?;

                match timeout(
                    Duration::from_secs(REQUEST_TIMEOUT_SECS),
                    client.completions().create(request),
                )
                .await
                {
                    Ok(Ok(response)) => response
                        .choices
                        .first()
                        .map(|c| c.text.clone())
                        .ok_or(LlmError::BadResponse),
                    Ok(Err(_)) => Err(LlmError::Unavailable),
                    Err(_) => Err(LlmError::Timeout),
                }
            }
        }
    }
}

fn describe(e: &LlmError) -> String {
    e.to_string()
}
