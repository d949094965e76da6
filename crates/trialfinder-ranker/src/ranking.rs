//! Deterministic ordering of scored trials.

use crate::scorer::ScoredTrial;

/// Highest score first; equal scores ordered by NCT id ascending.
/// The result depends only on the set of inputs, not their order.
pub fn rank(mut scored: Vec<ScoredTrial>) -> Vec<ScoredTrial> {
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.record.nct_id.cmp(&b.record.nct_id))
    });
    scored
}

/// First `n` trials of an already ranked list.
pub fn top_n(mut ranked: Vec<ScoredTrial>, n: usize) -> Vec<ScoredTrial> {
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialfinder_ingestion::{TrialRecord, TrialStatus};

    fn scored(id: &str, score: f64) -> ScoredTrial {
        ScoredTrial {
            record: TrialRecord::new(id, id, TrialStatus::Recruiting),
            score,
            reasons: vec![],
        }
    }

    fn ids(v: &[ScoredTrial]) -> Vec<&str> {
        v.iter().map(|s| s.nct_id()).collect()
    }

    #[test]
    fn test_descending_with_id_tiebreak() {
        let ranked = rank(vec![
            scored("NCT00000003", 40.0),
            scored("NCT00000002", 52.0),
            scored("NCT00000001", 40.0),
        ]);
        assert_eq!(ids(&ranked), vec!["NCT00000002", "NCT00000001", "NCT00000003"]);
    }

    #[test]
    fn test_order_independent_and_idempotent() {
        let a = vec![scored("NCT1", 1.0), scored("NCT2", 1.0), scored("NCT3", -5.0), scored("NCT4", 9.0)];
        let mut b = a.clone();
        b.reverse();
        let ra = rank(a);
        assert_eq!(ids(&ra), ids(&rank(b)));
        assert_eq!(ids(&rank(ra.clone())), ids(&ra));
    }

    #[test]
    fn test_top_n() {
        let ranked = rank(vec![scored("NCT1", 3.0), scored("NCT2", 2.0), scored("NCT3", 1.0)]);
        assert_eq!(ids(&top_n(ranked.clone(), 2)), vec!["NCT1", "NCT2"]);
        assert_eq!(top_n(ranked, 10).len(), 3);
    }
}
