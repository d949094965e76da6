//! Fetcher + normaliser against a scripted registry.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use trialfinder_common::{Diagnosis, TrialFinderError};
use trialfinder_ingestion::{
    normalize, FetchConfig, MockRegistrySource, QueryParams, SkipCause, TrialFetcher,
};
use trialfinder_test_utils::{page, uk_recurrent_gbm, StudyBuilder};

fn config() -> FetchConfig {
    FetchConfig { backoff_ms: 0, ..FetchConfig::default() }
}

#[tokio::test]
async fn test_two_pages_with_one_bad_entry() {
    let mock = Arc::new(
        MockRegistrySource::new()
            .with_page(page(vec![
                uk_recurrent_gbm("NCT10000001").build(),
                StudyBuilder::new("NCT10000002", "No id").without_id().build(),
            ]))
            .with_page(page(vec![
                uk_recurrent_gbm("NCT10000003").build(),
                uk_recurrent_gbm("NCT10000004").build(),
            ])),
    );
    let fetcher = TrialFetcher::new(mock.clone(), config());

    let pages = assert_ok!(fetcher.fetch_trials(&QueryParams::new(Diagnosis::Glioblastoma)).await);
    let (records, diag) = assert_ok!(normalize(&pages));

    let ids: Vec<&str> = records.iter().map(|r| r.nct_id.as_str()).collect();
    assert_eq!(ids, vec!["NCT10000001", "NCT10000003", "NCT10000004"]);
    assert_eq!(diag.total_fetched, 4);
    assert_eq!(diag.skipped, 1);
    assert_eq!(diag.count_for(SkipCause::MissingIdentifier), 1);
    assert_eq!(mock.tokens_seen(), vec![None, Some("page-1".to_string())]);
}

#[tokio::test]
async fn test_duplicate_across_pages_is_counted_once() {
    let mock = Arc::new(
        MockRegistrySource::new()
            .with_page(page(vec![uk_recurrent_gbm("NCT10000001").build()]))
            .with_page(page(vec![uk_recurrent_gbm("NCT10000001").build()])),
    );
    let fetcher = TrialFetcher::new(mock, config());
    let pages = assert_ok!(fetcher.fetch_trials(&QueryParams::new(Diagnosis::Glioblastoma)).await);
    let (records, diag) = assert_ok!(normalize(&pages));
    assert_eq!(records.len(), 1);
    assert_eq!(diag.duplicates, 1);
    assert_eq!(diag.skipped, 0);
}

#[tokio::test]
async fn test_unreachable_registry_surfaces_network_error() {
    let mut mock = MockRegistrySource::new().with_page(page(vec![]));
    for _ in 0..4 {
        mock = mock.fail_next(TrialFinderError::Network("connection refused".into()));
    }
    let fetcher = TrialFetcher::new(Arc::new(mock), config());
    let err = assert_err!(fetcher.fetch_trials(&QueryParams::new(Diagnosis::Glioblastoma)).await);
    assert!(matches!(err, TrialFinderError::Network(_)));
    assert!(err.user_message().starts_with("Trial data unavailable"));
}

#[tokio::test]
async fn test_bare_array_page_and_open_age_bounds() {
    let mock = Arc::new(MockRegistrySource::new().with_page(json!([
        StudyBuilder::new("NCT10000009", "Open ages").ages(Some("N/A"), None).build()
    ])));
    let fetcher = TrialFetcher::new(mock, config());
    let pages = assert_ok!(fetcher.fetch_trials(&QueryParams::new(Diagnosis::Glioblastoma)).await);
    let (records, _) = assert_ok!(normalize(&pages));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].min_age_years, None);
    assert!(records[0].accepts_age(55.0));
}
