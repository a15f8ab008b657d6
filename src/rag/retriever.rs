//! Turns a question into ranked context.
//!
//! The order of the retrieved chunks is significant: rank N (1-based) is what
//! the generator's `[Source N]` markers refer to.

use std::sync::Arc;

use super::store::{ScoredChunk, VectorIndex};
use crate::core::errors::ApiError;

/// Ranked retrieval results for one question. Exists for the lifetime of a
/// single exchange.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    hits: Vec<ScoredChunk>,
}

impl RetrievedContext {
    pub fn from_hits(hits: Vec<ScoredChunk>) -> Self {
        Self { hits }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Iterate hits with their 1-based rank.
    pub fn ranked(&self) -> impl Iterator<Item = (usize, &ScoredChunk)> {
        self.hits.iter().enumerate().map(|(i, hit)| (i + 1, hit))
    }

    /// Source URL for a 1-based rank, if that rank exists.
    pub fn url_for(&self, rank: usize) -> Option<&str> {
        if rank == 0 {
            return None;
        }
        self.hits.get(rank - 1).map(|hit| hit.chunk.url.as_str())
    }
}

#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, top_k: usize) -> Self {
        Self { index, top_k }
    }

    /// Fetch the top-k most relevant chunks for `question`. Errors surface
    /// unchanged; the chat pipeline decides whether to proceed without
    /// context.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievedContext, ApiError> {
        let hits = self.index.search(question, self.top_k).await?;
        Ok(RetrievedContext::from_hits(hits))
    }
}
