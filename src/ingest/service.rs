//! Feed and article ingestion into the vector index.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;

use super::extract::fetch_article;
use super::feed::{parse_rss, FeedItem};
use crate::core::errors::ApiError;
use crate::rag::{chunk_words, ChunkPolicy, DocumentChunk, VectorIndex};

const FEED_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize)]
pub struct FeedSummary {
    pub feed_title: String,
    pub articles_indexed: usize,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct IngestService {
    index: Arc<dyn VectorIndex>,
    client: Client,
    policy: ChunkPolicy,
    max_feed_items: usize,
}

impl IngestService {
    pub fn new(index: Arc<dyn VectorIndex>, policy: ChunkPolicy, max_feed_items: usize) -> Self {
        Self {
            index,
            client: Client::new(),
            policy,
            max_feed_items,
        }
    }

    /// Chunk one article and index it. Returns the number of chunks written.
    pub async fn ingest_article(
        &self,
        title: &str,
        url: &str,
        text: &str,
    ) -> Result<usize, ApiError> {
        let chunks: Vec<DocumentChunk> = chunk_words(text, self.policy)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, chunk_text)| DocumentChunk {
                text: chunk_text,
                title: title.to_string(),
                url: url.to_string(),
                chunk_index,
            })
            .collect();

        if chunks.is_empty() {
            return Ok(0);
        }

        let count = chunks.len();
        self.index.add_documents(chunks).await?;
        Ok(count)
    }

    /// Fetch an RSS feed and index its articles. Individual article failures
    /// are logged and skipped; the summary counts what made it in.
    pub async fn ingest_feed(&self, feed_url: &str) -> Result<FeedSummary, ApiError> {
        let response = self
            .client
            .get(feed_url)
            .timeout(FEED_TIMEOUT)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !response.status().is_success() {
            return Err(ApiError::Internal(format!(
                "fetching feed {} returned {}",
                feed_url,
                response.status()
            )));
        }

        let xml = response.text().await.map_err(ApiError::internal)?;
        let feed = parse_rss(&xml)?;
        if feed.items.is_empty() {
            return Err(ApiError::InvalidInput(
                "no items found in the RSS feed".into(),
            ));
        }

        let mut articles_indexed = 0;
        for item in feed.items.iter().take(self.max_feed_items) {
            match self.ingest_item(item).await {
                Ok(chunks) => {
                    articles_indexed += 1;
                    tracing::info!(title = %item.title, chunks, "article indexed");
                }
                Err(err) => {
                    tracing::warn!(link = %item.link, %err, "failed to ingest article");
                }
            }
        }

        Ok(FeedSummary {
            feed_title: feed.title.unwrap_or_else(|| "Unknown".to_string()),
            articles_indexed,
            fetched_at: Utc::now(),
        })
    }

    async fn ingest_item(&self, item: &FeedItem) -> Result<usize, ApiError> {
        let text = fetch_article(&self.client, &item.link).await?;
        self.ingest_article(&item.title, &item.link, &text).await
    }
}
