//! Knowledge retrieval.
//!
//! - `RagStore`: collection-scoped vector storage backend
//! - `SqliteRagStore`: in-process SQLite implementation
//! - `KnowledgeStore`: ingest/add/query/reset over one collection

mod knowledge;
mod sqlite;
mod store;

pub use knowledge::{Embedder, KnowledgeStore};
pub use sqlite::SqliteRagStore;
pub use store::{DocumentMatch, RagStore, StoredDocument};
