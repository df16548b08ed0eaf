//! Direct HTTP fetcher.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::Fetcher;
use crate::config::FetchConfig;

pub struct PlainFetcher {
    http: Client,
}

impl PlainFetcher {
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Fetcher for PlainFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("{url} returned HTTP {status}");
        }

        let body = resp
            .text()
            .await
            .with_context(|| format!("Failed to read body from {url}"))?;
        debug!(url, bytes = body.len(), "Page fetched");
        Ok(body)
    }

    async fn close(&mut self) -> Result<()> {
        // Pooled connections are released when the client drops.
        Ok(())
    }

    fn name(&self) -> &'static str {
        "plain"
    }
}
