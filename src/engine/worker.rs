//! Query worker — the per-query fetch → extract → decide → persist loop.
//!
//! One worker runs per query on its own task. It exclusively owns its
//! query definition (including the resolved version), its fetcher and
//! the last persisted value; the only shared state is the document store
//! and the stop token.

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fetch::Fetcher;
use crate::parse::{canonical_number, extract_value, to_number};
use crate::storage::{filter, from_document, to_document, Document, DocumentStore, SortDirection};
use crate::types::{QueryDefinition, ResultType, TrackedRecord, TrackerError};

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// The value was written.
    Persisted(String),
    /// Suppressed: equal to the last persisted value.
    Unchanged(String),
    /// Suppressed: already recorded for the current version.
    Duplicate(String),
    /// A recoverable error ended the tick early.
    Failed(TrackerError),
}

impl TickOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, TickOutcome::Persisted(_))
    }
}

/// Time left to sleep so that ticks start `interval_secs` apart.
pub fn sleep_duration(interval_secs: u64, elapsed: Duration) -> Duration {
    Duration::from_secs(interval_secs).saturating_sub(elapsed)
}

pub struct QueryWorker {
    query: QueryDefinition,
    store: Arc<dyn DocumentStore>,
    fetcher: Box<dyn Fetcher>,
    last_value: Option<String>,
}

impl QueryWorker {
    /// Build a worker, seeding the last value from storage when the query
    /// suppresses repeats. A storage error here is fatal to startup.
    pub async fn init(
        query: QueryDefinition,
        store: Arc<dyn DocumentStore>,
        fetcher: Box<dyn Fetcher>,
    ) -> Result<Self> {
        let mut last_value = None;
        if query.only_if_different {
            let latest = store
                .query_one(
                    &query.name,
                    &Document::new(),
                    "timestamp",
                    SortDirection::Descending,
                    0,
                )
                .await?;
            if let Some(doc) = latest {
                let record: TrackedRecord = from_document(doc)?;
                debug!(query = %query.name, value = %record.value, "Seeded last value");
                last_value = Some(record.value);
            }
        }

        Ok(Self {
            query,
            store,
            fetcher,
            last_value,
        })
    }

    pub fn query(&self) -> &QueryDefinition {
        &self.query
    }

    pub fn last_value(&self) -> Option<&str> {
        self.last_value.as_deref()
    }

    /// Produce the candidate value from a fresh fetch.
    async fn candidate(&self) -> Result<String, TrackerError> {
        let page = self
            .fetcher
            .fetch(&self.query.url)
            .await
            .map_err(|e| TrackerError::Fetch {
                url: self.query.url.clone(),
                message: format!("{e:#}"),
            })?;

        let raw = extract_value(&page, &self.query.before, &self.query.after, &self.query.any_tag)
            .map_err(TrackerError::Extraction)?;

        match self.query.result_type {
            ResultType::String => Ok(raw.to_string()),
            ResultType::Number => to_number(raw)
                .map(canonical_number)
                .map_err(TrackerError::NumberFormat),
        }
    }

    /// Whether no record with this value exists for the current version.
    async fn is_unique(&self, value: &str) -> Result<bool, TrackerError> {
        let existing = self
            .store
            .query_one(
                &self.query.name,
                &filter([("value", json!(value)), ("version", json!(self.query.version))]),
                "timestamp",
                SortDirection::Descending,
                0,
            )
            .await
            .map_err(|e| TrackerError::Storage(format!("{e:#}")))?;
        Ok(existing.is_none())
    }

    async fn persist(&mut self, value: String) -> Result<(), TrackerError> {
        let record = TrackedRecord {
            timestamp: Utc::now().timestamp(),
            value,
            version: self.query.version,
        };
        let doc = to_document(&record).map_err(|e| TrackerError::Storage(format!("{e:#}")))?;
        self.store
            .write(&self.query.name, doc)
            .await
            .map_err(|e| TrackerError::Storage(format!("{e:#}")))?;

        info!(
            query = %self.query.name,
            value = %record.value,
            version = record.version,
            timestamp = record.timestamp,
            "Value recorded"
        );
        self.last_value = Some(record.value);
        Ok(())
    }

    /// Run one fetch → extract → normalize → decide → persist pass.
    ///
    /// Never fails: every error is recoverable at this point and is
    /// reported through the outcome.
    pub async fn tick(&mut self) -> TickOutcome {
        let value = match self.candidate().await {
            Ok(v) => v,
            Err(e) => return TickOutcome::Failed(e),
        };

        if self.query.only_if_different && self.last_value.as_deref() == Some(value.as_str()) {
            return TickOutcome::Unchanged(value);
        }

        if self.query.only_if_unique {
            match self.is_unique(&value).await {
                Ok(true) => {}
                Ok(false) => return TickOutcome::Duplicate(value),
                Err(e) => return TickOutcome::Failed(e),
            }
        }

        match self.persist(value.clone()).await {
            Ok(()) => TickOutcome::Persisted(value),
            Err(e) => TickOutcome::Failed(e),
        }
    }

    /// Tick until `stop` is cancelled, then release the fetcher.
    ///
    /// The token is observed between ticks and during the interval sleep;
    /// a fetch or write in progress always completes first.
    pub async fn run(mut self, stop: CancellationToken) {
        info!(query = %self.query, backend = self.fetcher.name(), "Tracker started");

        while !stop.is_cancelled() {
            let started = Instant::now();

            match self.tick().await {
                TickOutcome::Persisted(_) => {}
                TickOutcome::Unchanged(value) => {
                    debug!(query = %self.query.name, %value, "Value unchanged, skipped");
                }
                TickOutcome::Duplicate(value) => {
                    debug!(query = %self.query.name, %value, "Value already recorded, skipped");
                }
                TickOutcome::Failed(e) => {
                    warn!(query = %self.query.name, error = %e, "Tick failed");
                }
            }

            let pause = sleep_duration(self.query.interval_seconds, started.elapsed());
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        if let Err(e) = self.fetcher.close().await {
            warn!(query = %self.query.name, error = %e, "Failed to close fetcher");
        }
        info!(query = %self.query.name, "Tracker stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
