//! Trial registry source clients.

pub mod clinicaltrials;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use trialfinder_common::{Result, TrialFinderError};

use crate::models::{QueryParams, RawTrialPage};

pub use clinicaltrials::ClinicalTrialsClient;

/// Common interface for trial registries.
///
/// One call = one HTTP request = one page. Paging and retry live in
/// [`crate::fetcher::TrialFetcher`].
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Fetch a single page of studies matching `query`.
    /// `page_token` is `None` for the first page.
    async fn fetch_page(
        &self,
        query: &QueryParams,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<RawTrialPage>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

// ── Mock Implementation for Testing ────────────────────────────────────────

/// Scripted registry for tests.
///
/// Serves a fixed list of pages chained by `page-<n>` tokens, so the same
/// result set can be fetched any number of times. Queued failures are
/// returned (one per call) before any page is served.
pub struct MockRegistrySource {
    pages: Vec<serde_json::Value>,
    failures: Mutex<VecDeque<TrialFinderError>>,
    calls: AtomicUsize,
    tokens_seen: Mutex<Vec<Option<String>>>,
}

impl MockRegistrySource {
    pub fn new() -> Self {
        Self {
            pages: vec![],
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            tokens_seen: Mutex::new(vec![]),
        }
    }

    /// Append a page. Pages that are JSON objects get a `nextPageToken`
    /// pointing at the following page unless they are last.
    pub fn with_page(mut self, page: serde_json::Value) -> Self {
        self.pages.push(page);
        self
    }

    /// Queue an error for the next call.
    pub fn fail_next(self, err: TrialFinderError) -> Self {
        if let Ok(mut q) = self.failures.lock() {
            q.push_back(err);
        }
        self
    }

    /// Total `fetch_page` calls so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Page tokens received, in call order.
    pub fn tokens_seen(&self) -> Vec<Option<String>> {
        self.tokens_seen.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn page_index(token: Option<&str>) -> Result<usize> {
        match token {
            None => Ok(0),
            Some(t) => t
                .strip_prefix("page-")
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| TrialFinderError::Registry {
                    status: 400,
                    message: format!("unknown page token {t}"),
                }),
        }
    }
}

impl Default for MockRegistrySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistrySource for MockRegistrySource {
    async fn fetch_page(
        &self,
        _query: &QueryParams,
        page_token: Option<&str>,
        _page_size: usize,
    ) -> Result<RawTrialPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.tokens_seen.lock() {
            seen.push(page_token.map(String::from));
        }

        let queued = self.failures.lock().ok().and_then(|mut q| q.pop_front());
        if let Some(err) = queued {
            return Err(err);
        }

        let idx = Self::page_index(page_token)?;
        let mut page = match self.pages.get(idx) {
            Some(p) => p.clone(),
            None => serde_json::json!({ "studies": [] }),
        };
        if idx + 1 < self.pages.len() {
            if let Some(obj) = page.as_object_mut() {
                obj.insert("nextPageToken".into(), format!("page-{}", idx + 1).into());
            }
        }
        Ok(RawTrialPage(page))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
