use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use tenk_core::errors::LlmError;
use tenk_core::llm::{complete_typed, CompletionRequest, LlmClient, OutputSchema};
use tenk_core::prompt::render;

use crate::prompts::{self, SearchPrompts};

/// Separator between already-asked questions in the duplicate-avoidance
/// prompt; keeps question texts visually distinct for the model.
const ASKED_SEPARATOR: &str = " || ";

/// A refined subquestion plus its own synthetic answer.
#[derive(Clone, Debug)]
pub struct GeneratedSubquery {
    pub question: String,
    pub synthetic_answer: String,
}

#[derive(Debug, Deserialize)]
struct SubquestionPayload {
    subquestion: String,
}

fn subquestion_schema() -> OutputSchema {
    OutputSchema::new(
        "subquestion",
        json!({
            "type": "object",
            "properties": {
                "subquestion": {
                    "type": "string",
                    "description": "A new subquestion to ask in order to retrieve more relevant context."
                }
            },
            "required": ["subquestion"]
        }),
    )
}

/// Generates synthetic reference answers and refined subquestions.
///
/// Duplicate avoidance is a prompt instruction only: the loop does not
/// reject a repeated subquestion, it just wastes the round (its passages
/// dedup away in the evidence store).
pub struct SubqueryGenerator {
    llm: Arc<dyn LlmClient>,
    synthetic_prompt: String,
    subquery_prompt: String,
}

impl SubqueryGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: &SearchPrompts) -> Self {
        Self {
            llm,
            synthetic_prompt: prompts.synthetic_answer.clone(),
            subquery_prompt: prompts.subquery.clone(),
        }
    }

    /// Produce the synthetic "ideal" answer for a question. Round 0 calls
    /// this directly; [`next`] calls it for each generated subquestion.
    ///
    /// [`next`]: SubqueryGenerator::next
    pub async fn bootstrap(&self, question: &str) -> Result<String, LlmError> {
        let user = render(prompts::SYNTHETIC_ANSWER_USER, &[("question", question)]);
        let answer = self
            .llm
            .complete(&CompletionRequest::new(&self.synthetic_prompt, user))
            .await?;
        Ok(answer.trim().to_string())
    }

    /// Produce the next subquestion (avoiding `already_asked`, best-effort)
    /// and its synthetic answer.
    pub async fn next(
        &self,
        original_question: &str,
        already_asked: &[String],
    ) -> Result<GeneratedSubquery, LlmError> {
        let already = already_asked.join(ASKED_SEPARATOR);
        let user = render(
            prompts::SUBQUERY_USER,
            &[
                ("original_question", original_question),
                ("already", already.as_str()),
            ],
        );
        let request = CompletionRequest::new(&self.subquery_prompt, user);
        let payload: SubquestionPayload =
            complete_typed(self.llm.as_ref(), &request, &subquestion_schema()).await?;

        let synthetic_answer = self.bootstrap(&payload.subquestion).await?;
        Ok(GeneratedSubquery {
            question: payload.subquestion,
            synthetic_answer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenk_llm::{MockLlm, MockReply};

    fn generator(replies: Vec<MockReply>) -> (Arc<MockLlm>, SubqueryGenerator) {
        let llm = Arc::new(MockLlm::new(replies));
        let generator = SubqueryGenerator::new(llm.clone(), &SearchPrompts::default());
        (llm, generator)
    }

    #[tokio::test]
    async fn bootstrap_returns_trimmed_answer() {
        let (llm, generator) = generator(vec![MockReply::text("  Revenue was $2.1B.  ")]);
        let answer = generator.bootstrap("What were revenues?").await.unwrap();
        assert_eq!(answer, "Revenue was $2.1B.");
        assert_eq!(llm.seen_user_prompts()[0], "QUESTION: What were revenues?");
    }

    #[tokio::test]
    async fn next_generates_question_then_its_synthetic_answer() {
        let (llm, generator) = generator(vec![
            MockReply::json(json!({"subquestion": "How did rides revenue change?"})),
            MockReply::text("Rides revenue rose 15%."),
        ]);

        let generated = generator
            .next(
                "What happened to revenue?",
                &["What happened to revenue?".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(generated.question, "How did rides revenue change?");
        assert_eq!(generated.synthetic_answer, "Rides revenue rose 15%.");

        let sent = llm.seen_user_prompts();
        assert!(sent[0].contains("ALREADY_ASKED: What happened to revenue?"));
        assert_eq!(sent[1], "QUESTION: How did rides revenue change?");
    }

    #[tokio::test]
    async fn already_asked_questions_joined_for_prompt() {
        let (llm, generator) = generator(vec![
            MockReply::json(json!({"subquestion": "s"})),
            MockReply::text("a"),
        ]);

        generator
            .next("orig", &["q1".to_string(), "q2".to_string()])
            .await
            .unwrap();

        assert!(llm.seen_user_prompts()[0].contains("ALREADY_ASKED: q1 || q2"));
    }

    #[tokio::test]
    async fn malformed_subquestion_payload_errors() {
        let (_, generator) = generator(vec![MockReply::json(json!({"wrong": "shape"}))]);
        let err = generator.next("orig", &[]).await.unwrap_err();
        assert!(matches!(err, LlmError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn synthetic_failure_after_subquestion_errors() {
        let (_, generator) = generator(vec![
            MockReply::json(json!({"subquestion": "s"})),
            MockReply::Error(LlmError::NetworkError("down".into())),
        ]);
        let err = generator.next("orig", &[]).await.unwrap_err();
        assert!(matches!(err, LlmError::NetworkError(_)));
    }
}
