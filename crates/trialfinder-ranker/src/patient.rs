//! Patient-side inputs to scoring.

use serde::{Deserialize, Serialize};
use trialfinder_common::{Diagnosis, DiseaseSetting};
use trialfinder_ingestion::QueryParams;

/// What the scorer knows about the patient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientFactors {
    pub age: Option<u32>,
    /// Karnofsky performance status, 0–100.
    pub kps: Option<u32>,
    pub setting: Option<DiseaseSetting>,
    pub diagnosis: Diagnosis,
    pub keywords: Vec<String>,
    pub prior_bevacizumab: bool,
    pub country: Option<String>,
}

impl PatientFactors {
    /// Patient factors carried by a search query. Prior bevacizumab
    /// exposure is not a query filter, so it is passed separately.
    pub fn from_query(query: &QueryParams, prior_bevacizumab: bool) -> Self {
        Self {
            age: query.age,
            kps: query.performance_status,
            setting: query.setting,
            diagnosis: query.diagnosis.clone(),
            keywords: query.keywords.clone(),
            prior_bevacizumab,
            country: query.country().map(String::from),
        }
    }
}
