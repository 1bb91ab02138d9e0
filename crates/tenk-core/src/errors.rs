use std::time::Duration;

/// Typed error hierarchy for LLM completion calls.
/// Classifies errors as fatal (don't retry) or retryable.
#[derive(Clone, Debug, thiserror::Error)]
pub enum LlmError {
    // Fatal — don't retry
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Retryable
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("server error {status}: {body}")]
    ServerError { status: u16, body: String },
    #[error("model backend overloaded")]
    Overloaded,
    #[error("network error: {0}")]
    NetworkError(String),
    /// The model's reply could not be coerced into the requested schema.
    /// A resampled completion often parses, so this is retryable.
    #[error("malformed output: {0}")]
    MalformedOutput(String),

    // Operational
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ServerError { .. }
                | Self::Overloaded
                | Self::NetworkError(_)
                | Self::MalformedOutput(_)
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_) | Self::InvalidRequest(_))
    }

    pub fn suggested_delay(&self) -> Option<Duration> {
        if let Self::RateLimited { retry_after } = self {
            *retry_after
        } else {
            None
        }
    }

    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::Overloaded => "overloaded",
            Self::NetworkError(_) => "network_error",
            Self::MalformedOutput(_) => "malformed_output",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    /// Classify an HTTP status code into the appropriate error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            400 => Self::InvalidRequest(body),
            429 => Self::RateLimited { retry_after: None },
            529 => Self::Overloaded,
            500..=599 => Self::ServerError { status, body },
            _ => Self::InvalidRequest(format!("unexpected status {status}: {body}")),
        }
    }
}

/// Errors from the report passage retriever. All of these are fatal to the
/// owning search session: without evidence the loop cannot proceed.
#[derive(Clone, Debug, thiserror::Error)]
pub enum RetrieverError {
    #[error("retriever unavailable: {0}")]
    Unavailable(String),
    #[error("retriever returned a bad response: {0}")]
    BadResponse(String),
    #[error("retriever timeout after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(LlmError::RateLimited { retry_after: None }.is_retryable());
        assert!(LlmError::ServerError { status: 500, body: "err".into() }.is_retryable());
        assert!(LlmError::Overloaded.is_retryable());
        assert!(LlmError::NetworkError("tcp".into()).is_retryable());
        assert!(LlmError::MalformedOutput("not json".into()).is_retryable());
    }

    #[test]
    fn fatal_classification() {
        assert!(LlmError::AuthenticationFailed("bad key".into()).is_fatal());
        assert!(LlmError::InvalidRequest("bad".into()).is_fatal());
        assert!(!LlmError::MalformedOutput("junk".into()).is_fatal());
    }

    #[test]
    fn not_retryable_and_not_fatal() {
        let timeout = LlmError::Timeout(Duration::from_secs(30));
        assert!(!timeout.is_retryable());
        assert!(!timeout.is_fatal());

        let cancelled = LlmError::Cancelled;
        assert!(!cancelled.is_retryable());
        assert!(!cancelled.is_fatal());
    }

    #[test]
    fn suggested_delay_only_for_rate_limit() {
        let rl = LlmError::RateLimited {
            retry_after: Some(Duration::from_secs(5)),
        };
        assert_eq!(rl.suggested_delay(), Some(Duration::from_secs(5)));

        let se = LlmError::ServerError { status: 500, body: "err".into() };
        assert_eq!(se.suggested_delay(), None);
    }

    #[test]
    fn from_status_mapping() {
        assert!(LlmError::from_status(401, "unauthorized".into()).is_fatal());
        assert!(LlmError::from_status(400, "bad request".into()).is_fatal());
        assert!(LlmError::from_status(429, "rate limited".into()).is_retryable());
        assert!(matches!(LlmError::from_status(529, "overloaded".into()), LlmError::Overloaded));
        assert!(LlmError::from_status(500, "internal".into()).is_retryable());
        assert!(LlmError::from_status(502, "bad gateway".into()).is_retryable());
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(LlmError::Cancelled.error_kind(), "cancelled");
        assert_eq!(LlmError::MalformedOutput("x".into()).error_kind(), "malformed_output");
        assert_eq!(
            LlmError::RateLimited { retry_after: None }.error_kind(),
            "rate_limited"
        );
    }

    #[test]
    fn retriever_error_display() {
        let e = RetrieverError::Unavailable("connection refused".into());
        assert!(e.to_string().contains("connection refused"));
    }
}
