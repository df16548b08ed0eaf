//! SQLite document store.
//!
//! Documents are stored as JSON text in a single `documents` table keyed
//! by collection name. Equality filters and sorting are evaluated in SQL
//! with `json_extract`. Only `collection` is indexed, so a filtered
//! lookup scans that collection's documents inside SQLite.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::str::FromStr;
use tracing::{debug, info};

use super::{Document, DocumentStore, SortDirection};

const MAX_CONNECTIONS: u32 = 8;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        collection TEXT NOT NULL,
        body TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents (collection)",
];

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and apply the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid SQLite URL: {url}"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database: {url}"))?;

        let store = Self { pool };
        store.migrate().await?;
        info!(url, "SQLite document store ready");
        Ok(store)
    }

    /// In-memory database on a single connection, for tests.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        for stmt in SCHEMA {
            sqlx::query(*stmt)
                .execute(&self.pool)
                .await
                .context("Failed to apply SQLite schema")?;
        }
        Ok(())
    }

    /// Append `WHERE collection = ? AND <filter>` to a query.
    fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, collection: &str, filter: &Document) -> Result<()> {
        qb.push(" WHERE collection = ");
        qb.push_bind(collection.to_string());

        for (key, value) in filter {
            qb.push(" AND json_extract(body, ");
            qb.push_bind(json_path(key));
            qb.push(")");
            match value {
                Value::Null => {
                    qb.push(" IS NULL");
                }
                Value::Bool(b) => {
                    qb.push(" = ");
                    qb.push_bind(i64::from(*b));
                }
                Value::Number(n) => {
                    qb.push(" = ");
                    if let Some(i) = n.as_i64() {
                        qb.push_bind(i);
                    } else {
                        qb.push_bind(n.as_f64().unwrap_or(f64::NAN));
                    }
                }
                Value::String(s) => {
                    qb.push(" = ");
                    qb.push_bind(s.clone());
                }
                Value::Array(_) | Value::Object(_) => {
                    anyhow::bail!("Unsupported filter value for field {key}: {value}");
                }
            }
        }
        Ok(())
    }
}

fn json_path(key: &str) -> String {
    format!("$.\"{}\"", key.replace('"', "\\\""))
}

fn decode(body: &str) -> Result<Document> {
    match serde_json::from_str::<Value>(body).context("Corrupt document body")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("Stored document is not an object: {other}"),
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO collections (name) VALUES (?)")
            .bind(collection)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create collection {collection}"))?;
        debug!(collection, "Collection ensured");
        Ok(())
    }

    async fn write(&self, collection: &str, document: Document) -> Result<()> {
        let body = serde_json::to_string(&document).context("Failed to encode document")?;
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT OR IGNORE INTO collections (name) VALUES (?)")
            .bind(collection)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO documents (collection, body) VALUES (?, ?)")
            .bind(collection)
            .bind(body)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to write to collection {collection}"))?;
        tx.commit().await?;
        Ok(())
    }

    async fn query_one(
        &self,
        collection: &str,
        filter: &Document,
        sort_key: &str,
        direction: SortDirection,
        skip: u64,
    ) -> Result<Option<Document>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT body FROM documents");
        Self::push_filter(&mut qb, collection, filter)?;
        qb.push(" ORDER BY json_extract(body, ");
        qb.push_bind(json_path(sort_key));
        qb.push(") ");
        qb.push(direction.as_sql());
        qb.push(", id ");
        qb.push(direction.as_sql());
        qb.push(" LIMIT 1 OFFSET ");
        qb.push_bind(i64::try_from(skip).unwrap_or(i64::MAX));

        let body: Option<String> = qb
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to query collection {collection}"))?;

        body.as_deref().map(decode).transpose()
    }

    async fn query_all(&self, collection: &str, filter: &Document) -> Result<Vec<Document>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT body FROM documents");
        Self::push_filter(&mut qb, collection, filter)?;
        qb.push(" ORDER BY id ASC");

        let bodies: Vec<String> = qb
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to query collection {collection}"))?;

        bodies.iter().map(|b| decode(b)).collect()
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM documents WHERE collection = ?")
            .bind(collection)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(collection)
            .execute(&mut *tx)
            .await?;
        tx.commit()
            .await
            .with_context(|| format!("Failed to drop collection {collection}"))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
