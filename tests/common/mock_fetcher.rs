//! Mock fetcher for integration testing.
//!
//! Serves a scripted sequence of pages per query, entirely in-memory.
//! Counts fetch and close calls so tests can assert on teardown.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use webtrack::fetch::Fetcher;

/// Shared counters observed by the test after the fetcher is moved into a worker.
#[derive(Default)]
pub struct FetchStats {
    pub fetches: AtomicUsize,
    pub closes: AtomicUsize,
}

impl FetchStats {
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct MockFetcher {
    pages: Mutex<VecDeque<Result<String, String>>>,
    /// Served once the script runs out; `None` means fail.
    fallback: Option<String>,
    stats: Arc<FetchStats>,
}

impl MockFetcher {
    /// A fetcher that returns `pages` in order, then fails.
    pub fn scripted(pages: Vec<String>, stats: Arc<FetchStats>) -> Self {
        Self {
            pages: Mutex::new(pages.into_iter().map(Ok).collect()),
            fallback: None,
            stats,
        }
    }

    /// A fetcher that always returns the same page.
    pub fn constant(page: impl Into<String>, stats: Arc<FetchStats>) -> Self {
        Self {
            pages: Mutex::new(VecDeque::new()),
            fallback: Some(page.into()),
            stats,
        }
    }

    /// Queue a page after any already scripted responses.
    pub fn push_page(&self, page: String) {
        self.pages.lock().unwrap().push_back(Ok(page));
    }

    /// Queue a transport failure after any already scripted responses.
    pub fn push_error(&self, msg: &str) {
        self.pages.lock().unwrap().push_back(Err(msg.to_string()));
    }
}

/// Wrap a value in the page layout the test definitions expect.
pub fn price_page(value: &str) -> String {
    format!("<html><body><p>pricetag: {value} USD</p></body></html>")
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, _url: &str) -> Result<String> {
        self.stats.fetches.fetch_add(1, Ordering::SeqCst);
        match self.pages.lock().unwrap().pop_front() {
            Some(Ok(page)) => Ok(page),
            Some(Err(msg)) => Err(anyhow!(msg)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| anyhow!("mock script exhausted")),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
