use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

/// Abstract generation/embedding backend.
///
/// The stream returned by `stream_chat` is finite, order-preserving and not
/// restartable; the consumer must drain it or drop the receiver to cancel.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// Streaming chat completion. Each received item is one text increment.
    async fn stream_chat(
        &self,
        request: ChatRequest,
        model_id: &str,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError>;

    /// Generate one embedding vector per input.
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}
