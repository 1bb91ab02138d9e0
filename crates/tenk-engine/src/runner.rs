use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use tenk_core::llm::LlmClient;
use tenk_core::retriever::Retriever;
use tenk_core::session::{
    SearchConfig, SearchOutcome, SearchSession, SubqueryRound, TerminationReason, Verdict,
};

use crate::compressor::ContextCompressor;
use crate::error::SearchError;
use crate::evaluator::AnswerEvaluator;
use crate::prompts::SearchPrompts;
use crate::subquery::SubqueryGenerator;
use crate::synthesizer::AnswerSynthesizer;

/// Drives one search session through retrieval rounds until the candidate
/// answer is accepted or the iteration bounds run out.
///
/// Each round is strictly sequential: fetch → accumulate → compress →
/// synthesize → evaluate → maybe generate the next subquestion. Independent
/// sessions share nothing but the injected capability handles, so one
/// runner serves concurrent callers.
pub struct SearchRunner {
    retriever: Arc<dyn Retriever>,
    config: SearchConfig,
    subquery: SubqueryGenerator,
    compressor: ContextCompressor,
    synthesizer: AnswerSynthesizer,
    evaluator: AnswerEvaluator,
}

impl SearchRunner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        retriever: Arc<dyn Retriever>,
        config: SearchConfig,
    ) -> Self {
        Self::with_prompts(llm, retriever, config, SearchPrompts::default())
    }

    pub fn with_prompts(
        llm: Arc<dyn LlmClient>,
        retriever: Arc<dyn Retriever>,
        config: SearchConfig,
        prompts: SearchPrompts,
    ) -> Self {
        Self {
            retriever,
            config,
            subquery: SubqueryGenerator::new(llm.clone(), &prompts),
            compressor: ContextCompressor::new(llm.clone(), &prompts),
            synthesizer: AnswerSynthesizer::new(llm.clone(), &prompts),
            evaluator: AnswerEvaluator::new(llm, &prompts),
        }
    }

    /// Run a search to termination. See [`run_with_cancel`] for the
    /// cancellable variant.
    ///
    /// [`run_with_cancel`]: SearchRunner::run_with_cancel
    pub async fn run(&self, ticker: &str, question: &str) -> Result<SearchOutcome, SearchError> {
        self.run_with_cancel(ticker, question, &CancellationToken::new())
            .await
    }

    #[instrument(skip_all, fields(ticker = %ticker))]
    pub async fn run_with_cancel(
        &self,
        ticker: &str,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome, SearchError> {
        self.config.validate().map_err(SearchError::InvalidConfig)?;

        let mut session = SearchSession::new(ticker, question);
        info!(session_id = %session.id, "starting retrieval search");

        // Bootstrap: round 0 is the original question with its synthetic
        // reference answer. Failure here is fatal — retrieval enrichment
        // and every evaluation depend on it.
        ensure_active(cancel)?;
        let synthetic = self
            .subquery
            .bootstrap(&session.original_question)
            .await
            .map_err(SearchError::Bootstrap)?;
        session.rounds.push(SubqueryRound::new(
            session.original_question.clone(),
            synthetic,
        ));

        loop {
            ensure_active(cancel)?;

            // FETCH: enrich the round's question with its synthetic answer
            // and accumulate deduplicated passages.
            let query = session
                .current_round()
                .expect("rounds are non-empty after bootstrap")
                .retrieval_query();
            let passages = self.retriever.fetch(&session.ticker, &query).await?;
            let added = session
                .evidence
                .add(passages.into_iter().map(|p| p.text));
            session.iteration += 1;
            debug!(
                session_id = %session.id,
                iteration = session.iteration,
                passages_added = added,
                evidence_len = session.evidence.len(),
                "retrieval round complete"
            );

            // COMPRESS: best-effort; on failure the uncompressed evidence
            // stays as-is.
            ensure_active(cancel)?;
            if session.evidence.char_len() >= self.config.context_character_threshold {
                let target = self.config.compression_target_chars();
                match self
                    .compressor
                    .compress(&session.original_question, &session.evidence.joined(), target)
                    .await
                {
                    Ok(summary) => {
                        session.evidence.replace_with_summary(summary);
                        debug!(session_id = %session.id, "evidence compressed");
                    }
                    Err(e) => {
                        warn!(
                            session_id = %session.id,
                            error = %e,
                            error_kind = e.error_kind(),
                            "compression failed; keeping uncompressed evidence"
                        );
                    }
                }
            }

            // ANSWER: a failed synthesis becomes an explanatory candidate
            // so evaluation and termination still run.
            ensure_active(cancel)?;
            let joined = session.evidence.joined();
            let candidate = match self
                .synthesizer
                .synthesize(&session.original_question, &joined)
                .await
            {
                Ok(answer) => answer,
                Err(e) => {
                    warn!(
                        session_id = %session.id,
                        error = %e,
                        "answer synthesis failed; substituting explanatory answer"
                    );
                    format!("Answer generation failed: {e}")
                }
            };
            session.candidate_answer = Some(candidate);

            // EVALUATE against round 0's synthetic answer — the reference
            // stays fixed for the whole session. A failed evaluation is
            // "no new signal": the previous verdict stands.
            ensure_active(cancel)?;
            let reference = session
                .reference_answer()
                .expect("round 0 exists")
                .to_string();
            let candidate = session.candidate_answer.clone().unwrap_or_default();
            match self
                .evaluator
                .compare(&session.original_question, &reference, &candidate)
                .await
            {
                Ok(review) => {
                    debug!(
                        session_id = %session.id,
                        verdict = review.verdict.as_numeric(),
                        "candidate evaluated"
                    );
                    session.last_verdict = Some(review.verdict);
                    session.last_review_reason = Some(review.reasoning);
                }
                Err(e) => {
                    warn!(
                        session_id = %session.id,
                        error = %e,
                        error_kind = e.error_kind(),
                        "evaluation failed; keeping previous verdict"
                    );
                }
            }

            // TERMINATION POLICY, in order: bound first, then the forced
            // minimum, then the verdict.
            if session.iteration >= self.config.max_iterations {
                session.terminate(TerminationReason::MaxIterations);
                break;
            }
            let below_minimum = self
                .config
                .min_iterations
                .is_some_and(|min| session.iteration < min);
            if !below_minimum {
                let rejected = session
                    .last_verdict
                    .map(Verdict::is_rejecting)
                    .unwrap_or(false);
                if !rejected {
                    session.terminate(TerminationReason::Accepted);
                    break;
                }
            }

            // SUBQUERY: build the next round. If no subquestion can be
            // produced the loop stops with what it has.
            ensure_active(cancel)?;
            match self
                .subquery
                .next(&session.original_question, &session.asked_questions())
                .await
            {
                Ok(generated) => {
                    debug!(
                        session_id = %session.id,
                        subquestion = %generated.question,
                        "continuing with refined subquestion"
                    );
                    session
                        .rounds
                        .push(SubqueryRound::new(generated.question, generated.synthetic_answer));
                }
                Err(e) => {
                    warn!(
                        session_id = %session.id,
                        error = %e,
                        "subquery generation failed; stopping with current answer"
                    );
                    session.terminate(TerminationReason::ForcedStop);
                    break;
                }
            }
        }

        info!(
            session_id = %session.id,
            iterations = session.iteration,
            termination = ?session.termination,
            "retrieval search finished"
        );
        Ok(session.into_outcome())
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), SearchError> {
    if cancel.is_cancelled() {
        Err(SearchError::Aborted)
    } else {
        Ok(())
    }
}
