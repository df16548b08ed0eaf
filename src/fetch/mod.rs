//! Page fetchers.
//!
//! Defines the `Fetcher` trait and provides two implementations:
//! - `PlainFetcher` — direct HTTP GET via reqwest
//! - `RenderedFetcher` — headless Chrome render, returns the serialized DOM

pub mod plain;
pub mod rendered;

use anyhow::Result;
use async_trait::async_trait;

pub use plain::PlainFetcher;
pub use rendered::RenderedFetcher;

use crate::config::FetchConfig;
use crate::types::{FetchBackend, QueryDefinition};

/// Abstraction over page retrieval backends.
///
/// Each worker owns exactly one fetcher for its lifetime and calls
/// `close` once at teardown.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the page content at `url`.
    async fn fetch(&self, url: &str) -> Result<String>;

    /// Release backend resources.
    async fn close(&mut self) -> Result<()>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Build the fetcher a query asks for.
pub fn for_query(query: &QueryDefinition, cfg: &FetchConfig) -> Result<Box<dyn Fetcher>> {
    match query.fetch_backend {
        FetchBackend::Plain => Ok(Box::new(PlainFetcher::new(cfg)?)),
        FetchBackend::Rendered => Ok(Box::new(RenderedFetcher::new(&query.name, cfg))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_query_selects_backend() {
        let cfg = FetchConfig::default();
        let mut q = QueryDefinition::sample("sel");
        assert_eq!(for_query(&q, &cfg).unwrap().name(), "plain");

        q.fetch_backend = FetchBackend::Rendered;
        assert_eq!(for_query(&q, &cfg).unwrap().name(), "rendered");
    }
}
