//! Vector index seam.
//!
//! The index owns embedding and distance computation behind `VectorIndex`;
//! the rest of the pipeline only ever sees chunk text, source metadata and a
//! relevance score.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// One indexed unit: a chunk of article text plus its source identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub title: String,
    pub url: String,
    pub chunk_index: usize,
}

/// A search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    /// Similarity score, higher is better.
    pub score: f32,
}

/// Abstract similarity index over document chunks.
///
/// `search` takes the query as text — computing the query embedding is the
/// implementation's concern. Asking for more results than the index holds
/// returns fewer, never an error.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn add_documents(&self, chunks: Vec<DocumentChunk>) -> Result<(), ApiError>;

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, ApiError>;
}
