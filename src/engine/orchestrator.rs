//! Orchestrator — validates the query set, prepares storage and versions,
//! and runs one worker task per query.
//!
//! Startup is strictly sequential and completes before any worker is
//! spawned: every fatal error (bad definition, reserved or duplicate name,
//! storage failure) surfaces from `start` with nothing left running.

use anyhow::Result;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::versions::VersionLedger;
use super::worker::QueryWorker;
use crate::fetch::Fetcher;
use crate::query::QuerySource;
use crate::storage::DocumentStore;
use crate::types::{QueryDefinition, TrackerError};

fn storage_err(e: anyhow::Error) -> TrackerError {
    TrackerError::Storage(format!("{e:#}"))
}

/// Handles of the running workers. `wait` is the aggregate completion.
pub struct RunningTrackers {
    workers: Vec<(String, JoinHandle<()>)>,
}

impl RunningTrackers {
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Resolve once every worker has exited.
    pub async fn wait(self) {
        let (names, handles): (Vec<_>, Vec<_>) = self.workers.into_iter().unzip();
        for (name, result) in names.iter().zip(join_all(handles).await) {
            if let Err(e) = result {
                error!(query = %name, error = %e, "Tracker task ended abnormally");
            }
        }
        info!(count = names.len(), "All trackers stopped");
    }
}

pub struct Orchestrator {
    store: Arc<dyn DocumentStore>,
    ledger: VersionLedger,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn DocumentStore>, version_collection: &str) -> Self {
        Self {
            ledger: VersionLedger::new(store.clone(), version_collection),
            store,
        }
    }

    pub fn ledger(&self) -> &VersionLedger {
        &self.ledger
    }

    /// Reject name sets that cannot be stored side by side.
    pub fn validate(&self, sources: &[QuerySource]) -> Result<(), TrackerError> {
        let mut seen = HashSet::new();
        for source in sources {
            if source.name.is_empty() {
                return Err(TrackerError::Config("query with an empty name".into()));
            }
            if source.name == self.ledger.collection() {
                return Err(TrackerError::Config(format!(
                    "query name {:?} is reserved for the version ledger",
                    source.name
                )));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(TrackerError::Config(format!(
                    "duplicate query name {:?}",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// Version and initialise one loaded query's worker.
    async fn prepare<F>(
        &self,
        mut query: QueryDefinition,
        hash: &str,
        make_fetcher: &F,
    ) -> Result<QueryWorker, TrackerError>
    where
        F: Fn(&QueryDefinition) -> Result<Box<dyn Fetcher>>,
    {
        self.store
            .ensure_collection(&query.name)
            .await
            .map_err(storage_err)?;

        query.version = self
            .ledger
            .resolve(&query.name, hash)
            .await
            .map_err(storage_err)?;

        let fetcher = make_fetcher(&query).map_err(|e| {
            TrackerError::Config(format!("query {}: cannot create fetcher: {e:#}", query.name))
        })?;

        info!(query = %query.name, version = query.version, hash = %hash, "Query prepared");
        QueryWorker::init(query, self.store.clone(), fetcher)
            .await
            .map_err(storage_err)
    }

    /// Load every definition, then prepare each query in order, then spawn
    /// one worker per query. A bad definition fails before storage is
    /// touched.
    ///
    /// All workers observe `stop`; the returned handle completes once all
    /// of them have exited.
    pub async fn start<F>(
        &self,
        sources: Vec<QuerySource>,
        make_fetcher: F,
        stop: CancellationToken,
    ) -> Result<RunningTrackers, TrackerError>
    where
        F: Fn(&QueryDefinition) -> Result<Box<dyn Fetcher>>,
    {
        self.validate(&sources)?;

        let loaded = sources
            .iter()
            .map(|source| source.load().map(|query| (query, source.content_hash())))
            .collect::<Result<Vec<_>, TrackerError>>()?;

        self.store
            .ensure_collection(self.ledger.collection())
            .await
            .map_err(storage_err)?;

        let mut prepared = Vec::with_capacity(loaded.len());
        for (query, hash) in loaded {
            prepared.push(self.prepare(query, &hash, &make_fetcher).await?);
        }

        let workers = prepared
            .into_iter()
            .map(|worker| {
                let name = worker.query().name.clone();
                let handle = tokio::spawn(worker.run(stop.clone()));
                (name, handle)
            })
            .collect::<Vec<_>>();

        info!(count = workers.len(), "Trackers started");
        Ok(RunningTrackers { workers })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
