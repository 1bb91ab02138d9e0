use std::sync::Arc;

use tenk_core::errors::LlmError;
use tenk_core::llm::{CompletionRequest, LlmClient};
use tenk_core::prompt::render;

use crate::prompts::{self, SearchPrompts};

/// Condenses accumulated evidence toward a character budget.
///
/// The target length is a soft ask: it is handed to the model but never
/// verified afterward. Failures must never abort the loop; the caller keeps
/// the uncompressed evidence.
pub struct ContextCompressor {
    llm: Arc<dyn LlmClient>,
    prompt: String,
}

impl ContextCompressor {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: &SearchPrompts) -> Self {
        Self {
            llm,
            prompt: prompts.compression.clone(),
        }
    }

    pub async fn compress(
        &self,
        question: &str,
        joined_evidence: &str,
        target_chars: usize,
    ) -> Result<String, LlmError> {
        let target = target_chars.to_string();
        let user = render(
            prompts::COMPRESSION_USER,
            &[
                ("question", question),
                ("data", joined_evidence),
                ("target", target.as_str()),
            ],
        );
        let summary = self
            .llm
            .complete(&CompletionRequest::new(&self.prompt, user))
            .await?;
        Ok(summary.trim().to_string())
    }
}
