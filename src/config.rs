//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The database URL may be overridden by `WEBTRACK_DATABASE_URL` so that
//! credentials can live in the environment (or `.env`) instead of the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Environment variable that replaces `storage.database_url` when set.
pub const DATABASE_URL_ENV: &str = "WEBTRACK_DATABASE_URL";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub queries: QueriesConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// "sqlite" | "memory"
    pub backend: String,
    #[serde(default)]
    pub database_url: String,
    /// Reserved collection holding the version ledger.
    #[serde(default = "default_version_collection")]
    pub version_collection: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueriesConfig {
    /// Directory scanned recursively for query definition files.
    pub directory: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Chrome/Chromium executable for the rendered backend.
    #[serde(default = "default_chrome_path")]
    pub chrome_path: String,
}

fn default_version_collection() -> String {
    "versions".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("webtrack/{}", env!("CARGO_PKG_VERSION"))
}
fn default_chrome_path() -> String {
    "chromium".into()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            chrome_path: default_chrome_path(),
        }
    }
}

impl StorageConfig {
    /// The effective database URL, preferring the environment override.
    pub fn database_url(&self) -> String {
        std::env::var(DATABASE_URL_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.database_url.clone())
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if config.storage.version_collection.trim().is_empty() {
            anyhow::bail!("storage.version_collection must not be empty");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let cfg = AppConfig::parse(
            r#"
            [storage]
            backend = "sqlite"
            database_url = "sqlite://webtrack.db"
            version_collection = "ledger"

            [queries]
            directory = "./queries"

            [fetch]
            timeout_secs = 5
            user_agent = "test-agent"
            chrome_path = "/usr/bin/google-chrome"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.storage.backend, "sqlite");
        assert_eq!(cfg.storage.version_collection, "ledger");
        assert_eq!(cfg.queries.directory, PathBuf::from("./queries"));
        assert_eq!(cfg.fetch.timeout_secs, 5);
        assert_eq!(cfg.fetch.chrome_path, "/usr/bin/google-chrome");
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::parse(
            r#"
            [storage]
            backend = "memory"

            [queries]
            directory = "q"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.storage.version_collection, "versions");
        assert_eq!(cfg.fetch.timeout_secs, 30);
        assert!(cfg.fetch.user_agent.starts_with("webtrack/"));
        assert_eq!(cfg.fetch.chrome_path, "chromium");
    }

    #[test]
    fn test_missing_section_rejected() {
        assert!(AppConfig::parse("[storage]\nbackend = \"memory\"\n").is_err());
    }

    #[test]
    fn test_empty_version_collection_rejected() {
        let result = AppConfig::parse(
            r#"
            [storage]
            backend = "memory"
            version_collection = " "

            [queries]
            directory = "q"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/webtrack.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
