//! Trial relevance scoring.
//!
//! score(trial, patient) = Σ weight(rule) × matches(rule)
//!
//! The sum is not clamped. Reasons appear in rule-table order and only for
//! rules that matched.

use serde::{Deserialize, Serialize};
use trialfinder_ingestion::TrialRecord;

use crate::patient::PatientFactors;
use crate::rules::{rule_table, Rule, TrialText};
use crate::weights::WeightVector;

/// A trial annotated with its score and the reasons behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTrial {
    #[serde(flatten)]
    pub record: TrialRecord,
    pub score: f64,
    pub reasons: Vec<String>,
}

impl ScoredTrial {
    pub fn nct_id(&self) -> &str {
        &self.record.nct_id
    }
}

/// Applies a rule table to trials.
#[derive(Debug, Clone)]
pub struct Scorer {
    rules: Vec<Rule>,
}

impl Scorer {
    pub fn new(weights: &WeightVector) -> Self {
        Self { rules: rule_table(weights) }
    }

    pub fn score(&self, record: TrialRecord, patient: &PatientFactors) -> ScoredTrial {
        let mut score = 0.0;
        let mut reasons = Vec::new();
        {
            let text = TrialText::new(&record);
            for rule in &self.rules {
                let matched = rule.criterion.evaluate(&text, patient);
                score += rule.weight * matched.len() as f64;
                reasons.extend(matched);
            }
        }
        ScoredTrial { record, score, reasons }
    }

    pub fn score_all(&self, records: Vec<TrialRecord>, patient: &PatientFactors) -> Vec<ScoredTrial> {
        records.into_iter().map(|r| self.score(r, patient)).collect()
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(&WeightVector::default())
    }
}

/// Score one trial with the default weights.
pub fn score(record: TrialRecord, patient: &PatientFactors) -> ScoredTrial {
    Scorer::default().score(record, patient)
}
