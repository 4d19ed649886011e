use async_trait::async_trait;

use super::types::{ChatRequest, EmbeddingTask};
use crate::core::errors::AppError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "gemini")
    fn name(&self) -> &str;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, AppError>;

    /// generate one embedding per input, in input order
    async fn embed(
        &self,
        inputs: &[String],
        model_id: &str,
        task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, AppError>;
}
