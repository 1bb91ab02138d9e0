use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::LlmError;

/// A single prompt sent to the model: a system instruction plus the
/// rendered user message, with optional sampling overrides.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// JSON-Schema shaped target for structured completions.
#[derive(Clone, Debug)]
pub struct OutputSchema {
    pub name: &'static str,
    pub schema: Value,
}

impl OutputSchema {
    pub fn new(name: &'static str, schema: Value) -> Self {
        Self { name, schema }
    }
}

/// Trait implemented by each LLM backend. The engine only ever sees this
/// seam; concrete clients live in tenk-llm.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    /// Plain text completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Completion coerced to the given schema. Returns the raw JSON value;
    /// callers deserialize via [`complete_typed`].
    async fn complete_structured(
        &self,
        request: &CompletionRequest,
        schema: &OutputSchema,
    ) -> Result<Value, LlmError>;
}

/// Run a structured completion and deserialize the result. A reply that does
/// not fit `T` is reported as [`LlmError::MalformedOutput`].
pub async fn complete_typed<T: DeserializeOwned>(
    client: &dyn LlmClient,
    request: &CompletionRequest,
    schema: &OutputSchema,
) -> Result<T, LlmError> {
    let value = client.complete_structured(request, schema).await?;
    serde_json::from_value(value.clone()).map_err(|e| {
        LlmError::MalformedOutput(format!("{} did not match schema {}: {e}", value, schema.name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct CannedClient {
        reply: Value,
    }

    #[async_trait]
    impl LlmClient for CannedClient {
        fn name(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned-model"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            Ok(self.reply.to_string())
        }

        async fn complete_structured(
            &self,
            _request: &CompletionRequest,
            _schema: &OutputSchema,
        ) -> Result<Value, LlmError> {
            Ok(self.reply.clone())
        }
    }

    #[derive(Debug, Deserialize)]
    struct Probe {
        answer: String,
    }

    #[test]
    fn request_builder() {
        let req = CompletionRequest::new("sys", "user")
            .with_temperature(0.0)
            .with_max_tokens(512);
        assert_eq!(req.system, "sys");
        assert_eq!(req.user, "user");
        assert_eq!(req.temperature, Some(0.0));
        assert_eq!(req.max_tokens, Some(512));
    }

    #[tokio::test]
    async fn typed_completion_deserializes() {
        let client = CannedClient {
            reply: json!({"answer": "42"}),
        };
        let schema = OutputSchema::new("probe", json!({"type": "object"}));
        let probe: Probe = complete_typed(
            &client,
            &CompletionRequest::new("sys", "user"),
            &schema,
        )
        .await
        .unwrap();
        assert_eq!(probe.answer, "42");
    }

    #[tokio::test]
    async fn typed_completion_flags_mismatch() {
        let client = CannedClient {
            reply: json!({"unexpected": 7}),
        };
        let schema = OutputSchema::new("probe", json!({"type": "object"}));
        let result: Result<Probe, _> = complete_typed(
            &client,
            &CompletionRequest::new("sys", "user"),
            &schema,
        )
        .await;
        let err = result.err().expect("expected error");
        assert!(matches!(err, LlmError::MalformedOutput(_)), "got: {err:?}");
    }
}
