//! Paginated registry retrieval with transient-error retry.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use trialfinder_common::Result;

use crate::models::{QueryParams, RawTrialPage};
use crate::sources::clinicaltrials::CT_API_URL;
use crate::sources::{ClinicalTrialsClient, RegistrySource};

/// Paging, retry and timeout settings for the fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Safety limit on pages per search.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First retry delay; doubles per attempt up to `max_backoff_ms`.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { CT_API_URL.to_string() }
fn default_page_size() -> usize { 100 }
fn default_max_pages() -> usize { 5 }
fn default_max_retries() -> u32 { 3 }
fn default_backoff_ms() -> u64 { 500 }
fn default_max_backoff_ms() -> u64 { 8_000 }
fn default_timeout_secs() -> u64 { trialfinder_common::sandbox::DEFAULT_TIMEOUT_SECS }

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FetchConfig {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor).min(self.max_backoff_ms))
    }
}

/// Walks `nextPageToken` chains against a [`RegistrySource`].
pub struct TrialFetcher {
    source: Arc<dyn RegistrySource>,
    config: FetchConfig,
}

impl TrialFetcher {
    pub fn new(source: Arc<dyn RegistrySource>, config: FetchConfig) -> Self {
        Self { source, config }
    }

    /// Fetcher backed by the live ClinicalTrials.gov client.
    pub fn clinicaltrials(config: FetchConfig) -> Result<Self> {
        let client = ClinicalTrialsClient::with_endpoint(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::new(Arc::new(client), config))
    }

    /// Fetch every page for `query`, up to `max_pages`.
    ///
    /// Pages are requested one after another. Any page failure (after
    /// retries) fails the whole call; partial results are never returned.
    #[instrument(skip(self, query), fields(source = self.source.name(), diagnosis = %query.diagnosis))]
    pub async fn fetch_trials(&self, query: &QueryParams) -> Result<Vec<RawTrialPage>> {
        let mut pages = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.fetch_with_retry(query, token.as_deref()).await?;
            token = page.next_page_token().map(String::from);
            pages.push(page);

            if token.is_none() {
                break;
            }
            if pages.len() >= self.config.max_pages {
                warn!(
                    max_pages = self.config.max_pages,
                    "Page limit reached; remaining registry results not fetched"
                );
                break;
            }
        }

        info!(pages = pages.len(), "Registry fetch complete");
        Ok(pages)
    }

    async fn fetch_with_retry(&self, query: &QueryParams, token: Option<&str>) -> Result<RawTrialPage> {
        let mut attempt = 0;
        loop {
            match self.source.fetch_page(query, token, self.config.page_size).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.backoff_for(attempt);
                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient registry failure, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockRegistrySource;
    use serde_json::json;
    use trialfinder_common::{Diagnosis, TrialFinderError};

    fn fast_config() -> FetchConfig {
        FetchConfig { backoff_ms: 0, ..FetchConfig::default() }
    }

    fn query() -> QueryParams {
        QueryParams::new(Diagnosis::Glioblastoma)
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let c = FetchConfig::default();
        assert_eq!(c.backoff_for(1), Duration::from_millis(500));
        assert_eq!(c.backoff_for(2), Duration::from_millis(1_000));
        assert_eq!(c.backoff_for(3), Duration::from_millis(2_000));
        assert_eq!(c.backoff_for(10), Duration::from_millis(8_000));
        assert_eq!(c.backoff_for(100), Duration::from_millis(8_000));
    }

    #[tokio::test]
    async fn test_follows_page_tokens() {
        let mock = Arc::new(
            MockRegistrySource::new()
                .with_page(json!({ "studies": [] }))
                .with_page(json!({ "studies": [] }))
                .with_page(json!({ "studies": [] })),
        );
        let fetcher = TrialFetcher::new(mock.clone(), fast_config());
        let pages = fetcher.fetch_trials(&query()).await.unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_stops_at_page_limit() {
        let mut mock = MockRegistrySource::new();
        for _ in 0..8 {
            mock = mock.with_page(json!({ "studies": [] }));
        }
        let mock = Arc::new(mock);
        let fetcher = TrialFetcher::new(mock.clone(), FetchConfig { max_pages: 2, ..fast_config() });
        let pages = fetcher.fetch_trials(&query()).await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let mock = Arc::new(
            MockRegistrySource::new()
                .with_page(json!({ "studies": [] }))
                .fail_next(TrialFinderError::Network("timed out".into()))
                .fail_next(TrialFinderError::Registry { status: 503, message: "busy".into() }),
        );
        let fetcher = TrialFetcher::new(mock.clone(), fast_config());
        let pages = fetcher.fetch_trials(&query()).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mock = Arc::new(
            MockRegistrySource::new()
                .with_page(json!({ "studies": [] }))
                .fail_next(TrialFinderError::Registry { status: 400, message: "bad filter".into() }),
        );
        let fetcher = TrialFetcher::new(mock.clone(), fast_config());
        let err = fetcher.fetch_trials(&query()).await.unwrap_err();
        assert!(matches!(err, TrialFinderError::Registry { status: 400, .. }));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let mut mock = MockRegistrySource::new().with_page(json!({ "studies": [] }));
        for _ in 0..4 {
            mock = mock.fail_next(TrialFinderError::Registry { status: 502, message: "gateway".into() });
        }
        let mock = Arc::new(mock);
        let fetcher = TrialFetcher::new(mock.clone(), fast_config());
        let err = fetcher.fetch_trials(&query()).await.unwrap_err();
        assert!(matches!(err, TrialFinderError::Registry { status: 502, .. }));
        assert_eq!(mock.calls(), 4);
    }

    #[tokio::test]
    async fn test_unknown_page_token_surfaces_registry_error() {
        let mock = Arc::new(
            MockRegistrySource::new()
                .with_page(json!({ "studies": [] }))
                .with_page(json!({ "studies": [] })),
        );
        let fetcher = TrialFetcher::new(mock.clone(), fast_config());
        let err = fetcher
            .fetch_with_retry(&query(), Some("bogus"))
            .await
            .unwrap_err();
        assert!(matches!(err, TrialFinderError::Registry { status: 400, .. }));
    }
}
