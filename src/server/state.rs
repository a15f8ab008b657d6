use std::sync::Arc;

use crate::chat::{ChatService, PromptLimits};
use crate::core::config::AppConfig;
use crate::ingest::IngestService;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::rag::{ChunkPolicy, QdrantIndex, Retriever, VectorIndex};
use crate::session::{SessionStore, SqliteKvStore};

/// Shared application state. Every dependency is constructed here and
/// injected explicitly; components never reach for globals.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LlmProvider>,
    pub chat: ChatService,
    pub ingest: IngestService,
    pub sessions: SessionStore,
}

impl AppState {
    pub async fn initialize(config: &AppConfig) -> anyhow::Result<Arc<Self>> {
        let generator: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(
            config.generation.base_url.clone(),
            config.generation.api_key.clone(),
        ));
        let embedder: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(
            config.embedding.base_url.clone(),
            config.embedding.api_key.clone(),
        ));

        let index = Arc::new(QdrantIndex::new(
            config.qdrant_url.clone(),
            config.qdrant_api_key.clone(),
            config.collection.clone(),
            config.vector_size,
            embedder,
            config.embedding.model.clone(),
        ));
        if let Err(err) = index.ensure_collection().await {
            tracing::warn!(%err, "could not verify qdrant collection; retrieval may fail");
        }
        let index: Arc<dyn VectorIndex> = index;

        let kv = Arc::new(SqliteKvStore::new(&config.session_db_path).await?);
        let sessions = SessionStore::new(kv);

        let retriever = Retriever::new(index.clone(), config.top_k);
        let chat = ChatService::new(
            generator.clone(),
            retriever,
            sessions.clone(),
            config.generation.model.clone(),
            PromptLimits {
                max_history_turns: config.max_history_turns,
            },
            config.retrieval_failure,
        );

        let ingest = IngestService::new(
            index,
            ChunkPolicy {
                window_size: config.chunk_window,
                overlap: config.chunk_overlap,
            },
            config.max_feed_items,
        );

        Ok(Arc::new(AppState {
            llm: generator,
            chat,
            ingest,
            sessions,
        }))
    }
}
