use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use tenk_core::errors::LlmError;
use tenk_core::llm::{CompletionRequest, LlmClient, OutputSchema};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TEMPERATURE: f64 = 0.1;

/// Client for an Ollama-compatible `/v1/completions` endpoint.
///
/// The endpoint is completions-only: structured output is obtained by
/// instructing the model to emit a single JSON object and extracting it
/// from the reply text.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    bearer_token: Option<SecretString>,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            bearer_token: None,
        }
    }

    /// Bearer token for hosted gateways that front the same API shape.
    pub fn with_bearer_token(mut self, token: SecretString) -> Self {
        self.bearer_token = Some(token);
        self
    }

    fn build_payload(&self, request: &CompletionRequest, user: &str) -> Value {
        serde_json::json!({
            "model": self.model,
            "prompt": format!("{}\n\n{}", request.system, user),
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        })
    }

    async fn post_completion(&self, payload: &Value) -> Result<String, LlmError> {
        let url = format!("{}/v1/completions", self.base_url);
        let mut req = self.client.post(&url).json(payload);
        if let Some(token) = &self.bearer_token {
            req = req.header("Authorization", format!("Bearer {}", token.expose_secret()));
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(REQUEST_TIMEOUT)
            } else {
                LlmError::NetworkError(e.to_string())
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status, body));
        }

        let body: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::MalformedOutput(format!("completion body: {e}")))?;
        body.first_text()
            .ok_or_else(|| LlmError::MalformedOutput("completion body had no choices".into()))
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let payload = self.build_payload(request, &request.user);
        let text = self.post_completion(&payload).await?;
        Ok(text.trim().to_string())
    }

    #[instrument(skip(self, request, schema), fields(model = %self.model, schema = schema.name))]
    async fn complete_structured(
        &self,
        request: &CompletionRequest,
        schema: &OutputSchema,
    ) -> Result<Value, LlmError> {
        let user = format!(
            "{}\n\nRespond with a single JSON object matching this schema, and nothing else:\n{}",
            request.user, schema.schema
        );
        let payload = self.build_payload(request, &user);
        let text = self.post_completion(&payload).await?;
        extract_json(&text)
    }
}

/// Both reply shapes the original backend emits: modern `choices` and the
/// legacy `completions` array.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChunk>,
    #[serde(default)]
    completions: Vec<CompletionChunk>,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    text: String,
}

impl CompletionResponse {
    fn first_text(&self) -> Option<String> {
        self.completions
            .first()
            .or_else(|| self.choices.first())
            .map(|c| c.text.clone())
    }
}

/// Pull the first JSON object out of a model reply that may carry prose or
/// markdown fences around it.
pub(crate) fn extract_json(text: &str) -> Result<Value, LlmError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(LlmError::MalformedOutput(format!(
        "no JSON object found in reply: {}",
        truncate_for_log(trimmed)
    )))
}

fn truncate_for_log(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}
