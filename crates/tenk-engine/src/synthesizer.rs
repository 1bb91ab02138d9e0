use std::sync::Arc;

use tenk_core::errors::LlmError;
use tenk_core::llm::{CompletionRequest, LlmClient};
use tenk_core::prompt::render;

use crate::prompts::{self, SearchPrompts};

/// Produces the candidate answer from the accumulated evidence.
/// Pure from the loop's point of view: same question + evidence, same call.
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
    prompt: String,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: &SearchPrompts) -> Self {
        Self {
            llm,
            prompt: prompts.answer.clone(),
        }
    }

    pub async fn synthesize(&self, question: &str, evidence: &str) -> Result<String, LlmError> {
        let user = render(
            prompts::ANSWER_USER,
            &[("data", evidence), ("question", question)],
        );
        let answer = self
            .llm
            .complete(&CompletionRequest::new(&self.prompt, user))
            .await?;
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenk_llm::{MockLlm, MockReply};

    fn synthesizer(replies: Vec<MockReply>) -> (Arc<MockLlm>, AnswerSynthesizer) {
        let llm = Arc::new(MockLlm::new(replies));
        let synth = AnswerSynthesizer::new(llm.clone(), &SearchPrompts::default());
        (llm, synth)
    }

    #[tokio::test]
    async fn renders_data_and_question() {
        let (llm, synth) = synthesizer(vec![MockReply::text("  Revenue grew 10% YoY.  ")]);
        let answer = synth
            .synthesize("What happened to revenue?", "Revenue grew 10%.")
            .await
            .unwrap();

        assert_eq!(answer, "Revenue grew 10% YoY.");
        let sent = llm.seen_user_prompts();
        assert_eq!(
            sent[0],
            "DATA: Revenue grew 10%.\nQUESTION: What happened to revenue?"
        );
    }

    #[tokio::test]
    async fn propagates_llm_error() {
        let (_, synth) = synthesizer(vec![MockReply::Error(LlmError::NetworkError("down".into()))]);
        let err = synth.synthesize("q", "d").await.unwrap_err();
        assert!(matches!(err, LlmError::NetworkError(_)));
    }
}
