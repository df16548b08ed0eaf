//! In-process document store.
//!
//! Same contract as the SQLite backend, held in a mutex-guarded map.
//! Used for `backend = "memory"` dry runs and throughout the tests.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Document, DocumentStore, SortDirection};

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection (0 if it does not exist).
    pub fn count(&self, collection: &str) -> usize {
        self.lock().get(collection).map_or(0, Vec::len)
    }

    /// Whether the collection has been created.
    pub fn has_collection(&self, collection: &str) -> bool {
        self.lock().contains_key(collection)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Document>>> {
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn matching(&self, collection: &str, filter: &Document) -> Vec<Document> {
        self.lock()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches_filter(doc, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| match doc.get(key) {
        Some(actual) => values_equal(actual, expected),
        None => expected.is_null(),
    })
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Missing sorts first, then null, bool, number, string, array, object.
fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::Bool(_)) => 2,
        Some(Value::Number(_)) => 3,
        Some(Value::String(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Object(_)) => 6,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        self.lock().entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn write(&self, collection: &str, document: Document) -> Result<()> {
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .push(document);
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
        let mut docs = self.matching(collection, filter);
        // Stable sort keeps insertion order among equal keys; reversing
        // yields newest-first for ties, matching the SQLite backend.
        docs.sort_by(|a, b| compare_values(a.get(sort_key), b.get(sort_key)));
        if direction == SortDirection::Descending {
            docs.reverse();
        }
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        Ok(docs.into_iter().nth(skip))
    }

    async fn query_all(&self, collection: &str, filter: &Document) -> Result<Vec<Document>> {
        Ok(self.matching(collection, filter))
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.lock().remove(collection);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::filter;
    use serde_json::json;

    fn doc(ts: i64, value: &str) -> Document {
        filter([("timestamp", json!(ts)), ("value", json!(value))])
    }

    #[tokio::test]
    async fn test_ensure_collection_idempotent() {
        let store = MemoryStore::new();
        store.ensure_collection("a").await.unwrap();
        store.write("a", doc(1, "x")).await.unwrap();
        store.ensure_collection("a").await.unwrap();
        assert_eq!(store.count("a"), 1);
    }

    #[tokio::test]
    async fn test_query_one_sorting_and_skip() {
        let store = MemoryStore::new();
        store.write("c", doc(2, "b")).await.unwrap();
        store.write("c", doc(1, "a")).await.unwrap();
        store.write("c", doc(3, "c")).await.unwrap();
        let empty = Document::new();

        let last = store
            .query_one("c", &empty, "timestamp", SortDirection::Descending, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last["value"], "c");

        let first = store
            .query_one("c", &empty, "timestamp", SortDirection::Ascending, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first["value"], "a");

        let second = store
            .query_one("c", &empty, "timestamp", SortDirection::Ascending, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second["value"], "b");

        let none = store
            .query_one("c", &empty, "timestamp", SortDirection::Ascending, 3)
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_filtering() {
        let store = MemoryStore::new();
        store.write("c", doc(1, "x")).await.unwrap();
        store.write("c", doc(2, "y")).await.unwrap();
        store.write("c", doc(3, "x")).await.unwrap();

        let xs = store
            .query_all("c", &filter([("value", json!("x"))]))
            .await
            .unwrap();
        assert_eq!(xs.len(), 2);

        let hit = store
            .query_one("c", &filter([("value", json!("y"))]), "timestamp", SortDirection::Descending, 0)
            .await
            .unwrap();
        assert_eq!(hit.unwrap()["timestamp"], 2);
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let store = MemoryStore::new();
        let empty = Document::new();
        assert!(store.query_all("nope", &empty).await.unwrap().is_empty());
        assert!(store
            .query_one("nope", &empty, "timestamp", SortDirection::Descending, 0)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_drop_collection() {
        let store = MemoryStore::new();
        store.write("c", doc(1, "x")).await.unwrap();
        store.drop_collection("c").await.unwrap();
        assert!(!store.has_collection("c"));
        assert_eq!(store.count("c"), 0);
    }

    #[test]
    fn test_integer_and_float_equal() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!("1"), &json!(1)));
    }
}
