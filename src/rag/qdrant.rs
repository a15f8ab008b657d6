//! Qdrant-backed vector index.
//!
//! Talks to Qdrant's REST API directly and embeds through an injected
//! [`LlmProvider`], so the rest of the crate never sees vectors.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

use super::store::{DocumentChunk, ScoredChunk, VectorIndex};
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

pub struct QdrantIndex {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    vector_size: usize,
    embedder: Arc<dyn LlmProvider>,
    embed_model: String,
}

impl QdrantIndex {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        collection: String,
        vector_size: usize,
        embedder: Arc<dyn LlmProvider>,
        embed_model: String,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            collection,
            vector_size,
            embedder,
            embed_model,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    /// Create the collection if it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<(), ApiError> {
        let path = format!("/collections/{}", self.collection);
        let res = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if res.status().is_success() {
            return Ok(());
        }

        let body = json!({
            "vectors": { "size": self.vector_size, "distance": "Cosine" }
        });
        let res = self
            .request(reqwest::Method::PUT, &path)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "creating collection {} returned {}: {}",
                self.collection, status, text
            )));
        }

        tracing::info!(collection = %self.collection, "created qdrant collection");
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn add_documents(&self, chunks: Vec<DocumentChunk>) -> Result<(), ApiError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts, &self.embed_model).await?;

        let points: Vec<Value> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                json!({
                    "id": Uuid::new_v4().to_string(),
                    "vector": vector,
                    "payload": {
                        "text": chunk.text,
                        "title": chunk.title,
                        "url": chunk.url,
                        "chunk_index": chunk.chunk_index,
                    }
                })
            })
            .collect();

        let path = format!("/collections/{}/points?wait=true", self.collection);
        let res = self
            .request(reqwest::Method::PUT, &path)
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "upsert returned {}: {}",
                status, text
            )));
        }

        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, ApiError> {
        let vectors = self
            .embedder
            .embed(&[query.to_string()], &self.embed_model)
            .await
            .map_err(|err| ApiError::Retrieval(err.to_string()))?;
        let vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Retrieval("embedding backend returned no vector".into()))?;

        let path = format!("/collections/{}/points/search", self.collection);
        let body = json!({
            "vector": vector,
            "limit": k,
            "with_payload": true,
        });

        let res = self
            .request(reqwest::Method::POST, &path)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::retrieval)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Retrieval(format!(
                "search returned {}: {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::retrieval)?;
        let hits = payload["result"]
            .as_array()
            .map(|items| items.iter().filter_map(hit_from_value).collect())
            .unwrap_or_default();

        Ok(hits)
    }
}

fn hit_from_value(value: &Value) -> Option<ScoredChunk> {
    let payload = value.get("payload")?;
    let chunk = DocumentChunk {
        text: payload["text"].as_str()?.to_string(),
        title: payload["title"].as_str().unwrap_or_default().to_string(),
        url: payload["url"].as_str().unwrap_or_default().to_string(),
        chunk_index: payload["chunk_index"].as_u64().unwrap_or(0) as usize,
    };
    let score = value["score"].as_f64().unwrap_or(0.0) as f32;
    Some(ScoredChunk { chunk, score })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_parsing_reads_payload_and_score() {
        let value = json!({
            "id": "9b2f",
            "score": 0.87,
            "payload": {
                "text": "Counting finished overnight.",
                "title": "Election wrap",
                "url": "https://news.example/wrap",
                "chunk_index": 3,
            }
        });

        let hit = hit_from_value(&value).unwrap();
        assert_eq!(hit.chunk.text, "Counting finished overnight.");
        assert_eq!(hit.chunk.title, "Election wrap");
        assert_eq!(hit.chunk.url, "https://news.example/wrap");
        assert_eq!(hit.chunk.chunk_index, 3);
        assert!((hit.score - 0.87).abs() < 1e-6);
    }

    #[test]
    fn hit_without_text_is_skipped() {
        let value = json!({ "score": 0.5, "payload": { "title": "no body" } });
        assert!(hit_from_value(&value).is_none());
    }
}
