use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use tenk_core::errors::LlmError;
use tenk_core::llm::{complete_typed, CompletionRequest, LlmClient, OutputSchema};
use tenk_core::prompt::render;
use tenk_core::session::Verdict;

use crate::prompts::{self, SearchPrompts};

/// Outcome of judging the candidate answer against the synthetic reference.
#[derive(Clone, Debug)]
pub struct Review {
    pub verdict: Verdict,
    pub reasoning: String,
}

/// Raw shape the model is asked to produce.
#[derive(Debug, Deserialize)]
struct ReviewPayload {
    reasoning: String,
    verdict: i64,
}

fn review_schema() -> OutputSchema {
    OutputSchema::new(
        "answer_review",
        json!({
            "type": "object",
            "properties": {
                "reasoning": {
                    "type": "string",
                    "description": "If answer two is worse than answer one, explain step by step what information is missing for it to be as good."
                },
                "verdict": {
                    "type": "integer",
                    "description": "-1 if answer one is better, 1 if answer two is better, 0 if equal.",
                    "minimum": -1,
                    "maximum": 1
                }
            },
            "required": ["reasoning", "verdict"]
        }),
    )
}

/// Judges candidate answers against the fixed reference answer.
pub struct AnswerEvaluator {
    llm: Arc<dyn LlmClient>,
    prompt: String,
}

impl AnswerEvaluator {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: &SearchPrompts) -> Self {
        Self {
            llm,
            prompt: prompts.compare.clone(),
        }
    }

    pub async fn compare(
        &self,
        question: &str,
        reference: &str,
        candidate: &str,
    ) -> Result<Review, LlmError> {
        let user = render(
            prompts::COMPARE_USER,
            &[
                ("question", question),
                ("reference", reference),
                ("candidate", candidate),
            ],
        );
        let request = CompletionRequest::new(&self.prompt, user);
        let payload: ReviewPayload =
            complete_typed(self.llm.as_ref(), &request, &review_schema()).await?;

        let verdict = Verdict::from_numeric(payload.verdict).ok_or_else(|| {
            LlmError::MalformedOutput(format!("verdict {} outside -1..=1", payload.verdict))
        })?;
        Ok(Review {
            verdict,
            reasoning: payload.reasoning,
        })
    }
}
