use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::sqlite::SqliteRagStore;
use super::store::{RagStore, StoredDocument};
use crate::core::config::{AppPaths, StoreSettings};
use crate::core::errors::AppError;
use crate::llm::{EmbeddingTask, LlmProvider};

/// Upper bound of inputs per batchEmbedContents call.
const EMBED_BATCH_SIZE: usize = 100;

/// Embedding function bound to one model. `document_mode` selects which side
/// of the retrieval the vectors are computed for.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn LlmProvider>,
    model: String,
    document_mode: bool,
}

impl Embedder {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            document_mode: true,
        }
    }

    pub fn for_documents(&self) -> Self {
        Self {
            document_mode: true,
            ..self.clone()
        }
    }

    pub fn for_queries(&self) -> Self {
        Self {
            document_mode: false,
            ..self.clone()
        }
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let task = if self.document_mode {
            EmbeddingTask::RetrievalDocument
        } else {
            EmbeddingTask::RetrievalQuery
        };

        let mut vectors = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(EMBED_BATCH_SIZE) {
            vectors.extend(self.provider.embed(batch, &self.model, task).await?);
        }
        Ok(vectors)
    }
}

/// Persistent collection of knowledge lines with similarity lookup.
pub struct KnowledgeStore {
    store: Arc<dyn RagStore>,
    embedder: Embedder,
    collection: String,
}

impl KnowledgeStore {
    /// Connect to the collection and load the seed file, if any.
    pub async fn open(
        store: Arc<dyn RagStore>,
        embedder: Embedder,
        collection: impl Into<String>,
        seed_path: Option<&Path>,
    ) -> Result<Self, AppError> {
        let knowledge = Self {
            store,
            embedder,
            collection: collection.into(),
        };

        if let Some(path) = seed_path {
            knowledge.ingest(path).await?;
        }

        Ok(knowledge)
    }

    /// SQLite-backed store under the configured persistence directory.
    pub async fn from_settings(
        paths: &AppPaths,
        settings: &StoreSettings,
        embedder: Embedder,
    ) -> Result<Self, AppError> {
        let persist_dir = paths.resolve(&settings.persist_directory);
        let backend = SqliteRagStore::open_dir(&persist_dir).await?;
        tracing::info!("Knowledge store opened at {}", backend.db_path().display());

        let seed = settings.seed_path.as_ref().map(|p| paths.resolve(p));
        Self::open(
            Arc::new(backend),
            embedder,
            settings.collection_name.clone(),
            seed.as_deref(),
        )
        .await
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Each non-blank trimmed line of `path` becomes one document whose id is
    /// the SHA-256 of its text. A missing file is skipped with a warning.
    pub async fn ingest(&self, path: &Path) -> Result<usize, AppError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Knowledge file not found, skipping ingest: {}", path.display());
                return Ok(0);
            }
            Err(err) => return Err(AppError::storage(err)),
        };

        let documents: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        let ids: Vec<String> = documents.iter().map(|d| content_id(d)).collect();

        let count = documents.len();
        self.add(documents, ids).await?;
        tracing::info!(
            "Ingested {} documents from {} into '{}'",
            count,
            path.display(),
            self.collection
        );
        Ok(count)
    }

    pub async fn add(&self, documents: Vec<String>, ids: Vec<String>) -> Result<(), AppError> {
        if documents.is_empty() {
            tracing::warn!("No documents to add to '{}'", self.collection);
            return Ok(());
        }
        if documents.len() != ids.len() {
            return Err(AppError::BadRequest(format!(
                "{} documents but {} ids",
                documents.len(),
                ids.len()
            )));
        }

        let embeddings = self.embedder.for_documents().embed(&documents).await?;
        if embeddings.len() != documents.len() {
            return Err(AppError::Internal(format!(
                "Embedding count mismatch: {} != {}",
                embeddings.len(),
                documents.len()
            )));
        }

        let items = ids
            .into_iter()
            .zip(documents)
            .zip(embeddings)
            .map(|((doc_id, content), embedding)| (StoredDocument { doc_id, content }, embedding))
            .collect();

        self.store.upsert_batch(&self.collection, items).await
    }

    /// Texts of the `k` most similar documents, best first.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<String>, AppError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .for_queries()
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Empty query embedding".to_string()))?;

        let matches = self.store.search(&self.collection, &embedding, k).await?;
        tracing::debug!("Retrieved {} documents for query", matches.len());

        Ok(matches.into_iter().map(|m| m.document.content).collect())
    }

    pub async fn reset(&self) -> Result<usize, AppError> {
        let removed = self.store.reset(&self.collection).await?;
        tracing::info!("Reset '{}' ({} documents removed)", self.collection, removed);
        Ok(removed)
    }

    pub async fn count(&self) -> Result<usize, AppError> {
        self.store.count(&self.collection).await
    }
}

fn content_id(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
