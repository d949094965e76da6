//! Weight vector for trial relevance scoring.

use serde::{Deserialize, Serialize};

/// Points contributed by each scoring rule when it matches.
/// Bonuses are positive, penalties negative. The score is their plain sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightVector {
    /// Diagnosis synonym in conditions, title or summary
    pub diagnosis: f64,
    /// Patient age inside the trial's age bounds
    pub age_eligible: f64,
    /// Disease setting mentioned in eligibility or summary
    pub setting: f64,
    /// A site in the patient's country
    pub country: f64,
    pub recruiting: f64,
    pub not_yet_recruiting: f64,
    pub phase2: f64,
    pub phase3: f64,
    /// Per extra keyword found
    pub keyword: f64,
    /// Criteria demand ECOG 0–1 and KPS is below 80 or unknown
    pub ecog_penalty: f64,
    /// Criteria mention Karnofsky and KPS is below 70 or unknown
    pub karnofsky_penalty: f64,
    /// Criteria exclude prior bevacizumab and the patient had it
    pub prior_bevacizumab_penalty: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            diagnosis:                 30.0,
            age_eligible:              10.0,
            setting:                    8.0,
            country:                   10.0,
            recruiting:                 4.0,
            not_yet_recruiting:         2.0,
            phase2:                     8.0,
            phase3:                    12.0,
            keyword:                    3.0,
            ecog_penalty:             -15.0,
            karnofsky_penalty:        -10.0,
            prior_bevacizumab_penalty: -25.0,
        }
    }
}

impl WeightVector {
    /// Bonuses must be ≥ 0, penalties ≤ 0, everything finite.
    pub fn validate(&self) -> bool {
        let all = self.as_array();
        let (bonuses, penalties) = all.split_at(9);
        bonuses.iter().all(|w| w.is_finite() && *w >= 0.0)
            && penalties.iter().all(|w| w.is_finite() && *w <= 0.0)
    }

    /// Bonuses first, then penalties.
    pub fn as_array(&self) -> [f64; 12] {
        [
            self.diagnosis,
            self.age_eligible,
            self.setting,
            self.country,
            self.recruiting,
            self.not_yet_recruiting,
            self.phase2,
            self.phase3,
            self.keyword,
            self.ecog_penalty,
            self.karnofsky_penalty,
            self.prior_bevacizumab_penalty,
        ]
    }
}
