use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceStore;
use crate::ids::SessionId;

/// One question/synthetic-answer pair driving a retrieval round.
/// Round 0's question is always the user's original question.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubqueryRound {
    pub question: String,
    pub synthetic_answer: String,
}

impl SubqueryRound {
    pub fn new(question: impl Into<String>, synthetic_answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            synthetic_answer: synthetic_answer.into(),
        }
    }

    /// The enriched similarity-search query for this round.
    pub fn retrieval_query(&self) -> String {
        format!("{} EXAMPLE: {}", self.question, self.synthetic_answer)
    }
}

/// Directional outcome of judging the candidate answer against the
/// synthetic reference. The loop only ever branches on [`is_rejecting`].
///
/// [`is_rejecting`]: Verdict::is_rejecting
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The reference answer is strictly better: information is missing.
    ReferenceBetter,
    Equal,
    CandidateBetter,
}

impl Verdict {
    pub fn from_numeric(value: i64) -> Option<Self> {
        match value {
            -1 => Some(Self::ReferenceBetter),
            0 => Some(Self::Equal),
            1 => Some(Self::CandidateBetter),
            _ => None,
        }
    }

    pub fn as_numeric(self) -> i8 {
        match self {
            Self::ReferenceBetter => -1,
            Self::Equal => 0,
            Self::CandidateBetter => 1,
        }
    }

    /// True when the candidate fell short and another round is warranted.
    pub fn is_rejecting(self) -> bool {
        matches!(self, Self::ReferenceBetter)
    }
}

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The iteration bound was reached. Checked before the verdict, so this
    /// reason wins even when the final round's answer was accepted.
    MaxIterations,
    /// The candidate answer held up against the reference.
    Accepted,
    /// The loop had to stop early (the subquery generator could not produce
    /// the next round) without the usual bounds being the cause.
    #[serde(rename = "min_iterations_not_met_but_forced_stop")]
    ForcedStop,
}

/// Iteration bounds and compression knobs for one search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Hard bound on retrieval rounds. At least 1.
    pub max_iterations: u32,
    /// Minimum rounds to run before an accepting verdict is honored.
    pub min_iterations: Option<u32>,
    /// Joined-evidence character length at which compression kicks in.
    pub context_character_threshold: usize,
    /// Compression target as a fraction of the threshold, in (0, 1).
    pub compression_target_ratio: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            min_iterations: None,
            context_character_threshold: 4000,
            compression_target_ratio: 0.7,
        }
    }
}

impl SearchConfig {
    /// Character budget handed to the compressor.
    pub fn compression_target_chars(&self) -> usize {
        (self.context_character_threshold as f64 * self.compression_target_ratio) as usize
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_iterations < 1 {
            return Err("max_iterations must be at least 1".into());
        }
        if let Some(min) = self.min_iterations {
            if min > self.max_iterations {
                return Err(format!(
                    "min_iterations ({min}) exceeds max_iterations ({})",
                    self.max_iterations
                ));
            }
        }
        if self.context_character_threshold == 0 {
            return Err("context_character_threshold must be positive".into());
        }
        if self.compression_target_ratio <= 0.0 || self.compression_target_ratio >= 1.0 {
            return Err(format!(
                "compression_target_ratio must be in (0, 1), got {}",
                self.compression_target_ratio
            ));
        }
        Ok(())
    }
}

/// In-memory state of one search. Created fresh per incoming question,
/// discarded once the final answer is produced; never persisted.
#[derive(Clone, Debug)]
pub struct SearchSession {
    pub id: SessionId,
    pub ticker: String,
    pub original_question: String,
    pub rounds: Vec<SubqueryRound>,
    pub evidence: EvidenceStore,
    pub candidate_answer: Option<String>,
    pub last_verdict: Option<Verdict>,
    pub last_review_reason: Option<String>,
    pub iteration: u32,
    pub termination: Option<TerminationReason>,
    pub final_answer: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl SearchSession {
    pub fn new(ticker: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            ticker: ticker.into(),
            original_question: question.into(),
            rounds: Vec::new(),
            evidence: EvidenceStore::new(),
            candidate_answer: None,
            last_verdict: None,
            last_review_reason: None,
            iteration: 0,
            termination: None,
            final_answer: None,
            started_at: Utc::now(),
        }
    }

    /// The round currently driving retrieval.
    pub fn current_round(&self) -> Option<&SubqueryRound> {
        self.rounds.last()
    }

    /// Round 0's synthetic answer: the fixed evaluation reference for the
    /// whole session.
    pub fn reference_answer(&self) -> Option<&str> {
        self.rounds.first().map(|r| r.synthetic_answer.as_str())
    }

    /// Every question asked so far, for the duplicate-avoidance prompt.
    pub fn asked_questions(&self) -> Vec<String> {
        self.rounds.iter().map(|r| r.question.clone()).collect()
    }

    /// Stamp the terminal state. The latest candidate becomes the final
    /// answer (or an explanatory placeholder if no synthesis ever ran).
    pub fn terminate(&mut self, reason: TerminationReason) {
        self.termination = Some(reason);
        self.final_answer = Some(
            self.candidate_answer
                .clone()
                .unwrap_or_else(|| "No answer could be produced from the report corpus.".into()),
        );
    }

    pub fn into_outcome(self) -> SearchOutcome {
        let termination = self.termination.unwrap_or(TerminationReason::ForcedStop);
        SearchOutcome {
            session_id: self.id,
            question: self.original_question,
            answer: self.final_answer.unwrap_or_default(),
            evidence: self.evidence.into_passages(),
            rounds: self.rounds,
            iterations: self.iteration,
            termination,
        }
    }
}

/// What a completed search hands back to the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub session_id: SessionId,
    pub question: String,
    pub answer: String,
    pub evidence: Vec<String>,
    pub rounds: Vec<SubqueryRound>,
    pub iterations: u32,
    pub termination: TerminationReason,
}

impl SearchOutcome {
    /// Answers cut off by the iteration bound carry less confidence than
    /// accepted ones; callers may want to qualify them.
    pub fn is_low_confidence(&self) -> bool {
        self.termination != TerminationReason::Accepted
    }
}
