//! Version ledger.
//!
//! Maps each query's definition content hash to a version number so that
//! every tracked record can be attributed to the definition that produced
//! it. The ledger is append-only and written only during startup, before
//! any worker runs.
//!
//! Resolution rules for `(name, hash)`:
//! 1. no entry for `name` → write version 0
//! 2. latest entry has `hash` → reuse its version, no write
//! 3. an older entry has `hash` → reuse that version (rollback), no write
//! 4. otherwise → write latest version + 1

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::storage::{filter, from_document, to_document, DocumentStore, SortDirection};
use crate::types::VersionRecord;

pub struct VersionLedger {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl VersionLedger {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Name of the reserved ledger collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The entry with the highest version for `name`.
    pub async fn latest(&self, name: &str) -> Result<Option<VersionRecord>> {
        self.store
            .query_one(
                &self.collection,
                &filter([("name", json!(name))]),
                "version",
                SortDirection::Descending,
                0,
            )
            .await?
            .map(from_document)
            .transpose()
    }

    /// The entry recorded for exactly `(name, hash)`, if any.
    pub async fn find(&self, name: &str, hash: &str) -> Result<Option<VersionRecord>> {
        self.store
            .query_one(
                &self.collection,
                &filter([("name", json!(name)), ("hash", json!(hash))]),
                "version",
                SortDirection::Descending,
                0,
            )
            .await?
            .map(from_document)
            .transpose()
    }

    async fn append(&self, record: &VersionRecord) -> Result<()> {
        self.store
            .write(&self.collection, to_document(record)?)
            .await
            .with_context(|| format!("Failed to record version {} of {}", record.version, record.name))
    }

    /// Resolve the version for a query definition with content `hash`.
    pub async fn resolve(&self, name: &str, hash: &str) -> Result<i64> {
        let Some(latest) = self.latest(name).await? else {
            let record = VersionRecord {
                name: name.to_string(),
                version: 0,
                hash: hash.to_string(),
            };
            self.append(&record).await?;
            info!(query = name, version = 0, "First version recorded");
            return Ok(0);
        };

        if latest.hash == hash {
            return Ok(latest.version);
        }

        if let Some(previous) = self.find(name, hash).await? {
            info!(
                query = name,
                version = previous.version,
                latest = latest.version,
                "Definition matches an earlier version, reusing it"
            );
            return Ok(previous.version);
        }

        let record = VersionRecord {
            name: name.to_string(),
            version: latest.version + 1,
            hash: hash.to_string(),
        };
        self.append(&record).await?;
        info!(query = name, version = record.version, "Definition changed, new version recorded");
        Ok(record.version)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
