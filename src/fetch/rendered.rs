//! Headless browser fetcher.
//!
//! Each fetch runs Chrome/Chromium in headless mode with `--dump-dom`, so
//! script-generated content is present in the returned HTML. Each worker
//! gets its own profile directory, removed again by `close`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::Fetcher;
use crate::config::FetchConfig;

pub struct RenderedFetcher {
    chrome_path: String,
    profile_dir: PathBuf,
    timeout: Duration,
    user_agent: String,
}

impl RenderedFetcher {
    pub fn new(query_name: &str, cfg: &FetchConfig) -> Self {
        let profile_dir = std::env::temp_dir().join(format!(
            "webtrack-chrome-{}-{}",
            query_name,
            std::process::id()
        ));
        Self {
            chrome_path: cfg.chrome_path.clone(),
            profile_dir,
            timeout: Duration::from_secs(cfg.timeout_secs),
            user_agent: cfg.user_agent.clone(),
        }
    }

    fn command(&self, url: &str) -> Command {
        let mut cmd = Command::new(&self.chrome_path);
        cmd.arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg(format!("--user-data-dir={}", self.profile_dir.display()))
            .arg(format!("--user-agent={}", self.user_agent))
            .arg("--dump-dom")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Fetcher for RenderedFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let child = self
            .command(url)
            .spawn()
            .with_context(|| format!("Failed to launch {}", self.chrome_path))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .with_context(|| format!("Render of {url} timed out after {:?}", self.timeout))?
            .with_context(|| format!("Render of {url} failed"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} exited with {}: {}", self.chrome_path, output.status, stderr.trim());
        }

        let dom = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(url, bytes = dom.len(), "Page rendered");
        Ok(dom)
    }

    async fn close(&mut self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.profile_dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(dir = %self.profile_dir.display(), error = %e, "Failed to remove browser profile");
                Err(e.into())
            }
        }
    }

    fn name(&self) -> &'static str {
        "rendered"
    }
}
