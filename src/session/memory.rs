//! In-memory KV backend, used in tests and as a zero-setup fallback.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::store::KvStore;
use crate::core::errors::ApiError;

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ApiError::Persistence("session map poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ApiError::Persistence("session map poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ApiError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ApiError::Persistence("session map poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}
