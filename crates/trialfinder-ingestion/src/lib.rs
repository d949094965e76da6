//! trialfinder-ingestion — Trial retrieval pipeline.
//! - Registry source clients (ClinicalTrials.gov v2)
//! - Paginated fetching with retry
//! - Normalisation of partial/malformed study JSON
//! - Deduplication
//! - Short-lived in-process result cache

pub mod cache;
pub mod dedup;
pub mod fetcher;
pub mod models;
pub mod normalise;
pub mod sources;

pub use cache::{CacheConfig, Clock, ManualClock, SystemClock, TrialCache};
pub use fetcher::{FetchConfig, TrialFetcher};
pub use models::{
    CacheKey, Location, QueryParams, RawTrialPage, SkipCause, SkipDiagnostics, TrialRecord,
    TrialStatus,
};
pub use normalise::normalize;
pub use sources::{MockRegistrySource, RegistrySource};
