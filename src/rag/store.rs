//! RagStore trait: storage backend for the knowledge collections.
//!
//! Every operation is scoped by collection name. The in-process implementation
//! lives in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::AppError;

/// One stored knowledge line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub doc_id: String,
    pub content: String,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMatch {
    pub document: StoredDocument,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait RagStore: Send + Sync {
    /// Insert or replace documents with their embeddings. Last write wins per id.
    async fn upsert_batch(
        &self,
        collection: &str,
        items: Vec<(StoredDocument, Vec<f32>)>,
    ) -> Result<(), AppError>;

    /// Up to `limit` documents ordered by descending similarity.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<DocumentMatch>, AppError>;

    async fn count(&self, collection: &str) -> Result<usize, AppError>;

    /// Delete every document of the collection, returning how many were removed.
    async fn reset(&self, collection: &str) -> Result<usize, AppError>;
}
