use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use tenk_core::errors::LlmError;
use tenk_core::llm::{CompletionRequest, LlmClient, OutputSchema};

/// Pre-programmed replies for deterministic testing without a model.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Plain completion text.
    Text(String),
    /// Structured completion value.
    Structured(Value),
    /// Fail the call with this error.
    Error(LlmError),
    /// Wait a duration, then yield the inner reply.
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn json(value: Value) -> Self {
        Self::Structured(value)
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delayed(delay, Box::new(inner))
    }
}

/// Mock client that yields scripted replies in order, one per call,
/// regardless of which completion method consumed them.
pub struct MockLlm {
    replies: Mutex<VecDeque<MockReply>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// The user prompts the caller actually sent, in order.
    pub fn seen_user_prompts(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    async fn next_reply(&self) -> Result<MockReply, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let reply = self.replies.lock().pop_front().ok_or_else(|| {
            LlmError::InvalidRequest(format!("MockLlm: no reply configured for call {call}"))
        })?;

        // Unroll nested delays iteratively.
        let mut current = reply;
        loop {
            match current {
                MockReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    current = *inner;
                }
                other => return Ok(other),
            }
        }
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.seen.lock().push(request.user.clone());
        match self.next_reply().await? {
            MockReply::Text(text) => Ok(text),
            MockReply::Structured(value) => Ok(value.to_string()),
            MockReply::Error(e) => Err(e),
            MockReply::Delayed(..) => unreachable!("delays are unrolled in next_reply"),
        }
    }

    async fn complete_structured(
        &self,
        request: &CompletionRequest,
        _schema: &OutputSchema,
    ) -> Result<Value, LlmError> {
        self.seen.lock().push(request.user.clone());
        match self.next_reply().await? {
            MockReply::Structured(value) => Ok(value),
            MockReply::Text(text) => serde_json::from_str(&text)
                .map_err(|e| LlmError::MalformedOutput(format!("mock text reply: {e}"))),
            MockReply::Error(e) => Err(e),
            MockReply::Delayed(..) => unreachable!("delays are unrolled in next_reply"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> OutputSchema {
        OutputSchema::new("probe", json!({"type": "object"}))
    }

    #[tokio::test]
    async fn replies_consumed_in_order() {
        let mock = MockLlm::new(vec![MockReply::text("first"), MockReply::text("second")]);
        let req = CompletionRequest::new("s", "u");

        assert_eq!(mock.complete(&req).await.unwrap(), "first");
        assert_eq!(mock.complete(&req).await.unwrap(), "second");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn exhausted_replies_error() {
        let mock = MockLlm::new(vec![MockReply::text("only one")]);
        let req = CompletionRequest::new("s", "u");

        let _ = mock.complete(&req).await;
        let err = mock.complete(&req).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn error_reply_propagates() {
        let mock = MockLlm::new(vec![MockReply::Error(LlmError::NetworkError("down".into()))]);
        let req = CompletionRequest::new("s", "u");
        let err = mock.complete(&req).await.unwrap_err();
        assert!(matches!(err, LlmError::NetworkError(_)));
    }

    #[tokio::test]
    async fn structured_reply_returned_as_value() {
        let mock = MockLlm::new(vec![MockReply::json(json!({"verdict": 1}))]);
        let req = CompletionRequest::new("s", "u");
        let value = mock.complete_structured(&req, &schema()).await.unwrap();
        assert_eq!(value["verdict"], 1);
    }

    #[tokio::test]
    async fn text_reply_parsed_for_structured_call() {
        let mock = MockLlm::new(vec![MockReply::text(r#"{"verdict": 0}"#)]);
        let req = CompletionRequest::new("s", "u");
        let value = mock.complete_structured(&req, &schema()).await.unwrap();
        assert_eq!(value["verdict"], 0);

        let mock = MockLlm::new(vec![MockReply::text("not json")]);
        let err = mock.complete_structured(&req, &schema()).await.unwrap_err();
        assert!(matches!(err, LlmError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn delayed_reply_waits() {
        tokio::time::pause();
        let mock = MockLlm::new(vec![MockReply::delayed(
            Duration::from_secs(5),
            MockReply::text("after delay"),
        )]);
        let req = CompletionRequest::new("s", "u");

        let fut = mock.complete(&req);
        tokio::pin!(fut);
        assert!(
            tokio::time::timeout(Duration::from_millis(1), &mut fut)
                .await
                .is_err(),
            "reply should still be pending before the delay elapses"
        );

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(fut.await.unwrap(), "after delay");
    }
}
