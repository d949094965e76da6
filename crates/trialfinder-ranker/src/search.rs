//! End-to-end search: cache → fetch → normalise → score → rank.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use trialfinder_common::Result;
use trialfinder_ingestion::{
    normalize, QueryParams, SkipDiagnostics, TrialCache, TrialFetcher,
};

use crate::patient::PatientFactors;
use crate::ranking::rank;
use crate::scorer::{ScoredTrial, Scorer};

/// Ranked trials plus what normalisation dropped along the way.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub trials: Vec<ScoredTrial>,
    pub diagnostics: SkipDiagnostics,
    pub from_cache: bool,
    pub fetched_at: DateTime<Utc>,
    pub filters: QueryParams,
}

impl SearchOutcome {
    /// No trial matched. Distinct from a failed search, which is an `Err`.
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Suggestion for widening an empty search; `None` when there are results.
    pub fn relaxation_hint(&self) -> Option<String> {
        if !self.is_empty() {
            return None;
        }
        let mut tips = Vec::new();
        if let Some(country) = self.filters.country() {
            tips.push(format!("remove the country filter ({country})"));
        }
        if !self.filters.keywords.is_empty() {
            tips.push("drop the extra keywords".to_string());
        }
        if self.filters.effective_statuses().len() < 2 {
            tips.push("include not-yet-recruiting trials".to_string());
        }
        tips.push(format!(
            "try a broader diagnosis than \"{}\"",
            self.filters.diagnosis.label()
        ));
        Some(format!("No matching trials. You could {}.", tips.join(", or ")))
    }
}

/// The retrieval and ranking pipeline.
pub struct TrialSearch {
    fetcher: TrialFetcher,
    cache: TrialCache,
    scorer: Scorer,
}

impl TrialSearch {
    pub fn new(fetcher: TrialFetcher, cache: TrialCache, scorer: Scorer) -> Self {
        Self { fetcher, cache, scorer }
    }

    pub fn cache(&self) -> &TrialCache {
        &self.cache
    }

    /// Run one search. `force_refresh` bypasses (and replaces) any cached
    /// entry for `filters`. Fails only when the registry cannot be read.
    #[instrument(skip_all, fields(diagnosis = %filters.diagnosis, force_refresh = force_refresh))]
    pub async fn search(
        &self,
        patient: &PatientFactors,
        filters: &QueryParams,
        force_refresh: bool,
    ) -> Result<SearchOutcome> {
        if force_refresh {
            self.cache.invalidate(Some(filters));
        }

        let cached = self
            .cache
            .get_or_fetch(filters, || async {
                let pages = self.fetcher.fetch_trials(filters).await?;
                normalize(&pages)
            })
            .await?;

        let trials = rank(self.scorer.score_all(cached.records, patient));
        info!(
            trials = trials.len(),
            skipped = cached.diagnostics.skipped,
            from_cache = cached.from_cache,
            "Search complete"
        );

        Ok(SearchOutcome {
            trials,
            diagnostics: cached.diagnostics,
            from_cache: cached.from_cache,
            fetched_at: cached.fetched_at,
            filters: filters.clone(),
        })
    }

    /// Invalidate one cached query, or everything when `query` is `None`.
    pub fn refresh(&self, query: Option<&QueryParams>) -> usize {
        let removed = self.cache.invalidate(query);
        info!(removed, "Cache invalidated");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialfinder_common::Diagnosis;

    fn empty_outcome(filters: QueryParams) -> SearchOutcome {
        SearchOutcome {
            trials: vec![],
            diagnostics: SkipDiagnostics::default(),
            from_cache: false,
            fetched_at: Utc::now(),
            filters,
        }
    }

    #[test]
    fn test_relaxation_hint_mentions_active_filters() {
        let q = QueryParams::new(Diagnosis::Ependymoma)
            .with_country("Norway")
            .with_keywords("proton");
        let hint = empty_outcome(q).relaxation_hint().unwrap();
        assert!(hint.contains("country filter (Norway)"));
        assert!(hint.contains("keywords"));
        assert!(hint.contains("Ependymoma"));
    }

    #[test]
    fn test_no_hint_when_results_exist() {
        let mut outcome = empty_outcome(QueryParams::new(Diagnosis::Glioblastoma));
        outcome.trials.push(ScoredTrial {
            record: trialfinder_ingestion::TrialRecord::new(
                "NCT00000001",
                "T",
                trialfinder_ingestion::TrialStatus::Recruiting,
            ),
            score: 1.0,
            reasons: vec![],
        });
        assert!(!outcome.is_empty());
        assert!(outcome.relaxation_hint().is_none());
    }
}
