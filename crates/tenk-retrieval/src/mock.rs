use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use tenk_core::errors::RetrieverError;
use tenk_core::retriever::{Passage, Retriever};

/// Mock retriever that yields scripted batches in order, one per fetch.
pub struct StaticRetriever {
    batches: Mutex<VecDeque<Result<Vec<Passage>, RetrieverError>>>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl StaticRetriever {
    pub fn new(batches: Vec<Result<Vec<Passage>, RetrieverError>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Convenience: script plain text passages only.
    pub fn with_texts(batches: Vec<Vec<&str>>) -> Self {
        Self::new(
            batches
                .into_iter()
                .map(|batch| Ok(batch.into_iter().map(Passage::new).collect()))
                .collect(),
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// The queries the engine actually sent, in order.
    pub fn seen_queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn fetch(&self, _ticker: &str, query: &str) -> Result<Vec<Passage>, RetrieverError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        self.queries.lock().push(query.to_string());
        self.batches.lock().pop_front().unwrap_or_else(|| {
            Err(RetrieverError::BadResponse(format!(
                "StaticRetriever: no batch configured for call {call}"
            )))
        })
    }
}
