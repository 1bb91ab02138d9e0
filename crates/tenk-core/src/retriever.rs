use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::RetrieverError;

/// A contiguous span of report text returned by similarity search.
/// Scores are best-effort and backend-specific; the loop never sorts by them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Passage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: None,
        }
    }

    pub fn scored(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score: Some(score),
        }
    }
}

/// Trait over the report vector-search backend. The engine only consumes
/// this seam; concrete clients live in tenk-retrieval.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Fetch passages for `query` within one company's report partition.
    /// May return an empty list.
    async fn fetch(&self, ticker: &str, query: &str) -> Result<Vec<Passage>, RetrieverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passage_serde_omits_missing_score() {
        let p = Passage::new("Revenue grew 10%.");
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("score"));

        let p = Passage::scored("Revenue grew 10%.", 0.87);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("score"));
    }

    #[test]
    fn passage_deserializes_without_score() {
        let p: Passage = serde_json::from_str(r#"{"text":"margin notes"}"#).unwrap();
        assert_eq!(p.text, "margin notes");
        assert!(p.score.is_none());
    }
}
