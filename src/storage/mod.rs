//! Persistence layer.
//!
//! Defines the `DocumentStore` trait — a minimal collection/document API
//! with equality filters — and provides two implementations:
//! - `SqliteStore` — durable JSON documents in SQLite via sqlx
//! - `MemoryStore` — in-process store for dry runs and tests

pub mod memory;
pub mod sqlite;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::StorageConfig;

/// An open field-name → value mapping.
pub type Document = Map<String, Value>;

/// Sort order for `query_one`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Abstraction over the document database.
///
/// Every operation is individually atomic; nothing spans calls.
/// A filter matches documents whose fields equal every filter entry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the collection if it does not exist yet.
    async fn ensure_collection(&self, collection: &str) -> Result<()>;

    /// Append a document.
    async fn write(&self, collection: &str, document: Document) -> Result<()>;

    /// Return the document at position `skip` after filtering and sorting
    /// by `sort_key`, or `None`.
    async fn query_one(
        &self,
        collection: &str,
        filter: &Document,
        sort_key: &str,
        direction: SortDirection,
        skip: u64,
    ) -> Result<Option<Document>>;

    /// Return every matching document in insertion order.
    async fn query_all(&self, collection: &str, filter: &Document) -> Result<Vec<Document>>;

    /// Remove the collection and all its documents.
    async fn drop_collection(&self, collection: &str) -> Result<()>;
}

/// Open the backend named in the configuration.
pub async fn connect(cfg: &StorageConfig) -> Result<Arc<dyn DocumentStore>> {
    match cfg.backend.as_str() {
        "sqlite" => {
            let store = SqliteStore::connect(&cfg.database_url()).await?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => anyhow::bail!("Unknown storage backend: {other}"),
    }
}

/// Serialise a record into a document.
pub fn to_document<T: Serialize>(record: &T) -> Result<Document> {
    match serde_json::to_value(record).context("Failed to serialise record")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("Record did not serialise to an object: {other}"),
    }
}

/// Deserialise a document back into a typed record.
pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T> {
    serde_json::from_value(Value::Object(document)).context("Failed to decode stored document")
}

/// Build an equality filter from `(field, value)` pairs.
pub fn filter<const N: usize>(entries: [(&str, Value); N]) -> Document {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
