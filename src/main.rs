//! WEBTRACK — Versioned periodic web value tracker
//!
//! Entry point. Loads configuration, initialises structured logging,
//! connects storage, starts one tracker per query definition and waits
//! for Ctrl+C / SIGTERM before draining every tracker.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use webtrack::config::AppConfig;
use webtrack::engine::Orchestrator;
use webtrack::fetch;
use webtrack::query::files::list_definition_files;
use webtrack::query::QuerySource;
use webtrack::storage;

const DEFAULT_CONFIG: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("WEBTRACK_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    info!(
        config = %config_path,
        backend = %cfg.storage.backend,
        queries = %cfg.queries.directory.display(),
        "WEBTRACK starting up"
    );

    let store = storage::connect(&cfg.storage).await?;

    let sources = list_definition_files(&cfg.queries.directory)?
        .iter()
        .map(|path| QuerySource::from_path(path))
        .collect::<Result<Vec<_>>>()?;
    info!(count = sources.len(), "Query definitions found");

    let stop = CancellationToken::new();
    let orchestrator = Orchestrator::new(store, &cfg.storage.version_collection);
    let fetch_cfg = cfg.fetch.clone();
    let trackers = orchestrator
        .start(sources, move |q| fetch::for_query(q, &fetch_cfg), stop.clone())
        .await
        .context("Startup aborted")?;

    info!(
        trackers = trackers.len(),
        "WEBTRACK initialized. Press Ctrl+C to stop."
    );

    wait_for_shutdown().await?;
    info!("Shutdown signal received. Gracefully exiting...");
    stop.cancel();
    trackers.wait().await;

    info!("WEBTRACK shut down cleanly.");
    Ok(())
}

/// Block until Ctrl+C or (on Unix) SIGTERM.
async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("Failed to listen for Ctrl+C")?,
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("webtrack=info"));

    let json_logging = std::env::var("WEBTRACK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
