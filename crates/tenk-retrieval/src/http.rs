use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tenk_core::errors::RetrieverError;
use tenk_core::retriever::{Passage, Retriever};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How many passages a similarity search returns per query.
const DEFAULT_TOP_K: usize = 5;

/// Client for the report vector-search service's query endpoint.
///
/// The service owns embedding and indexing of ingested reports; this side
/// only posts `{ticker, query, top_k}` and maps the ranked hits back.
pub struct HttpRetriever {
    client: Client,
    base_url: String,
    top_k: usize,
}

impl HttpRetriever {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    ticker: &'a str,
    query: &'a str,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    text: String,
    #[serde(default)]
    score: Option<f32>,
}

#[async_trait]
impl Retriever for HttpRetriever {
    #[instrument(skip_all, fields(ticker = %ticker, top_k = self.top_k))]
    async fn fetch(&self, ticker: &str, query: &str) -> Result<Vec<Passage>, RetrieverError> {
        let url = format!("{}/search", self.base_url);
        let body = SearchBody {
            ticker,
            query,
            top_k: self.top_k,
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RetrieverError::Timeout(REQUEST_TIMEOUT)
                } else {
                    RetrieverError::Unavailable(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RetrieverError::Unavailable(format!(
                "search endpoint returned {status}: {body}"
            )));
        }

        let hits: Vec<SearchHit> = resp
            .json()
            .await
            .map_err(|e| RetrieverError::BadResponse(e.to_string()))?;

        Ok(hits
            .into_iter()
            .map(|h| Passage {
                text: h.text,
                score: h.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let retriever = HttpRetriever::new("http://localhost:9200/");
        assert_eq!(retriever.base_url, "http://localhost:9200");
        assert_eq!(retriever.top_k, DEFAULT_TOP_K);
    }

    #[test]
    fn top_k_override() {
        let retriever = HttpRetriever::new("http://localhost:9200").with_top_k(12);
        assert_eq!(retriever.top_k, 12);
    }

    #[test]
    fn search_body_shape() {
        let body = SearchBody {
            ticker: "UBER",
            query: "key risks EXAMPLE: regulatory exposure",
            top_k: 5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["ticker"], "UBER");
        assert_eq!(json["top_k"], 5);
    }

    #[test]
    fn hits_deserialize_with_and_without_score() {
        let hits: Vec<SearchHit> = serde_json::from_str(
            r#"[{"text":"Revenue grew 10%.","score":0.91},{"text":"Margins held flat."}]"#,
        )
        .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, Some(0.91));
        assert!(hits[1].score.is_none());
    }

    #[tokio::test]
    async fn unreachable_endpoint_maps_to_unavailable() {
        // Port 1 is never listening; connect fails fast.
        let retriever = HttpRetriever::new("http://127.0.0.1:1");
        let err = retriever.fetch("UBER", "key risks").await.unwrap_err();
        assert!(matches!(err, RetrieverError::Unavailable(_)), "got: {err:?}");
    }
}
