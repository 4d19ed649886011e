//! SQLite-backed knowledge store.
//!
//! Document text and embeddings live in one table keyed by
//! `(collection, doc_id)`; similarity search is brute-force cosine over the
//! collection.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{DocumentMatch, RagStore, StoredDocument};
use crate::core::errors::AppError;

pub const DATABASE_FILE: &str = "knowledge.db";

pub struct SqliteRagStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteRagStore {
    /// Open (or create) `knowledge.db` inside `persist_dir`.
    pub async fn open_dir(persist_dir: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(persist_dir).map_err(AppError::storage)?;
        Self::with_path(persist_dir.join(DATABASE_FILE)).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(AppError::storage)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS knowledge_documents (
                collection TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (collection, doc_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(AppError::storage)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn upsert_batch(
        &self,
        collection: &str,
        items: Vec<(StoredDocument, Vec<f32>)>,
    ) -> Result<(), AppError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(AppError::storage)?;

        for (document, embedding) in &items {
            sqlx::query(
                "INSERT OR REPLACE INTO knowledge_documents (collection, doc_id, content, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(collection)
            .bind(&document.doc_id)
            .bind(&document.content)
            .bind(Self::serialize_embedding(embedding))
            .execute(&mut *tx)
            .await
            .map_err(AppError::storage)?;
        }

        tx.commit().await.map_err(AppError::storage)?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<DocumentMatch>, AppError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT doc_id, content, embedding
             FROM knowledge_documents
             WHERE collection = ?1
             ORDER BY rowid",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::storage)?;

        let mut scored: Vec<DocumentMatch> = rows
            .iter()
            .map(|row| {
                let bytes: Vec<u8> = row.get("embedding");
                let score = cosine_similarity(query_embedding, &Self::deserialize_embedding(&bytes));
                DocumentMatch {
                    document: StoredDocument {
                        doc_id: row.get("doc_id"),
                        content: row.get("content"),
                    },
                    score,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_documents WHERE collection = ?1")
                .bind(collection)
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::storage)?;

        Ok(count as usize)
    }

    async fn reset(&self, collection: &str) -> Result<usize, AppError> {
        let result = sqlx::query("DELETE FROM knowledge_documents WHERE collection = ?1")
            .bind(collection)
            .execute(&self.pool)
            .await
            .map_err(AppError::storage)?;

        Ok(result.rows_affected() as usize)
    }
}
