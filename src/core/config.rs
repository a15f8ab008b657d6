use std::env;
use std::path::PathBuf;

/// Base URL, optional API key and model name for one OpenAI-compatible
/// endpoint. The base URL includes the version prefix (e.g. `.../v1`).
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

/// What to do when retrieval fails mid-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalFailurePolicy {
    /// Answer from an empty context and log a warning.
    EmptyContext,
    /// Fail the exchange.
    Abort,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub collection: String,
    pub vector_size: usize,
    pub embedding: EndpointConfig,
    pub generation: EndpointConfig,
    pub chunk_window: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub retrieval_failure: RetrievalFailurePolicy,
    pub max_history_turns: usize,
    pub max_feed_items: usize,
    pub session_db_path: PathBuf,
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Build the configuration from the environment. Every knob has a
    /// default so a bare `newsdesk-backend` starts against local services.
    pub fn from_env() -> Self {
        AppConfig {
            bind_addr: env_string("NEWSDESK_ADDR", "127.0.0.1:8000"),
            qdrant_url: env_string("QDRANT_URL", "http://127.0.0.1:6333"),
            qdrant_api_key: env_opt("QDRANT_API_KEY"),
            collection: env_string("QDRANT_COLLECTION", "articles"),
            vector_size: env_usize("QDRANT_VECTOR_SIZE", 1024),
            embedding: EndpointConfig {
                base_url: env_string("EMBEDDING_API_URL", "https://api.jina.ai/v1"),
                api_key: env_opt("EMBEDDING_API_KEY"),
                model: env_string("EMBEDDING_MODEL", "jina-embeddings-v3"),
            },
            generation: EndpointConfig {
                base_url: env_string("GENERATION_API_URL", "http://127.0.0.1:8080/v1"),
                api_key: env_opt("GENERATION_API_KEY"),
                model: env_string("GENERATION_MODEL", "default"),
            },
            chunk_window: env_usize("CHUNK_WINDOW", 300),
            chunk_overlap: env_usize("CHUNK_OVERLAP", 50),
            top_k: env_usize("RETRIEVAL_TOP_K", 4),
            retrieval_failure: match env_string("RETRIEVAL_ON_ERROR", "empty").as_str() {
                "abort" => RetrievalFailurePolicy::Abort,
                _ => RetrievalFailurePolicy::EmptyContext,
            },
            max_history_turns: env_usize("MAX_HISTORY_TURNS", 12),
            max_feed_items: env_usize("MAX_FEED_ITEMS", 30),
            session_db_path: PathBuf::from(env_string("SESSION_DB", "sessions.db")),
            log_dir: env_opt("LOG_DIR").map(PathBuf::from),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|val| !val.trim().is_empty())
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(default)
}
