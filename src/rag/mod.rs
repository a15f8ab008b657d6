//! Retrieval side of the pipeline: chunking, the vector index seam and the
//! retriever that turns a question into ranked context.

pub mod chunker;
pub mod qdrant;
pub mod retriever;
pub mod store;

pub use chunker::{chunk_words, ChunkPolicy};
pub use qdrant::QdrantIndex;
pub use retriever::{RetrievedContext, Retriever};
pub use store::{DocumentChunk, ScoredChunk, VectorIndex};
