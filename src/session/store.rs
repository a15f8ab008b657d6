//! Per-session conversation memory.
//!
//! Sessions are keyed by an opaque identifier supplied by the caller's auth
//! layer. The adapter owns the JSON encoding of the ordered turn list; the
//! backend only sees strings.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a session. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Minimal key-value contract the session layer needs. Backends guarantee
/// atomic get/set per key, nothing more.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), ApiError>;
    async fn delete(&self, key: &str) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Load the ordered history for a session. A key that was never written
    /// is an empty history, not an error.
    pub async fn load(&self, session_key: &str) -> Result<Vec<ConversationTurn>, ApiError> {
        match self.kv.get(session_key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(ApiError::persistence),
            None => Ok(Vec::new()),
        }
    }

    pub async fn save(
        &self,
        session_key: &str,
        history: &[ConversationTurn],
    ) -> Result<(), ApiError> {
        let encoded = serde_json::to_string(history).map_err(ApiError::persistence)?;
        self.kv.set(session_key, &encoded).await
    }

    pub async fn clear(&self, session_key: &str) -> Result<(), ApiError> {
        self.kv.delete(session_key).await
    }
}
