use tenk_core::errors::{LlmError, RetrieverError};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The retriever failed. Fatal: without evidence the loop cannot
    /// proceed meaningfully.
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrieverError),

    /// The round-0 synthetic answer could not be generated. Fatal: every
    /// later round retrieves and evaluates against it.
    #[error("bootstrap synthetic answer failed: {0}")]
    Bootstrap(#[source] LlmError),

    #[error("invalid search config: {0}")]
    InvalidConfig(String),

    /// The caller cancelled mid-round; no partial state survives.
    #[error("search aborted")]
    Aborted,
}
