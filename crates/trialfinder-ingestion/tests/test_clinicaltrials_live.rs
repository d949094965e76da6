//! Query the live ClinicalTrials.gov registry.
//!
//! Run with: cargo test --package trialfinder-ingestion --test test_clinicaltrials_live -- --ignored --nocapture

use trialfinder_common::Diagnosis;
use trialfinder_ingestion::{normalize, FetchConfig, QueryParams, TrialFetcher};

#[tokio::test]
#[ignore] // Requires network access
async fn test_live_glioblastoma_search() {
    let fetcher = TrialFetcher::clinicaltrials(FetchConfig { max_pages: 1, page_size: 20, ..FetchConfig::default() })
        .expect("client construction failed");

    let query = QueryParams::new(Diagnosis::Glioblastoma).with_country("United Kingdom");
    let pages = fetcher.fetch_trials(&query).await.expect("ClinicalTrials.gov fetch failed");
    let (records, diag) = normalize(&pages).expect("normalisation failed");

    println!("Fetched {} studies, kept {}, skipped {}", diag.total_fetched, records.len(), diag.skipped);
    for r in records.iter().take(5) {
        println!("{} [{}] {}", r.nct_id, r.status.display_name(), r.title);
    }

    assert!(!records.is_empty(), "Should find at least one recruiting trial");
}
