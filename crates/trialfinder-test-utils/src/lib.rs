//! Registry JSON fixtures for tests.
//!
//! Builds studies in the ClinicalTrials.gov v2 nested shape
//! (`protocolSection.*Module.*`) so tests exercise the same paths as
//! live responses.

use serde_json::{json, Value};

/// Builder for one v2 study object.
#[derive(Debug, Clone)]
pub struct StudyBuilder {
    nct_id: Option<String>,
    title: Option<String>,
    status: Option<String>,
    conditions: Vec<String>,
    eligibility: Option<String>,
    min_age: Option<String>,
    max_age: Option<String>,
    locations: Vec<(String, String, String)>,
    phases: Vec<String>,
    summary: Option<String>,
    sponsor: Option<String>,
}

impl StudyBuilder {
    /// A recruiting study with an id and title and nothing else.
    pub fn new(nct_id: &str, title: &str) -> Self {
        Self {
            nct_id: Some(nct_id.to_string()),
            title: Some(title.to_string()),
            status: Some("RECRUITING".to_string()),
            conditions: vec![],
            eligibility: None,
            min_age: None,
            max_age: None,
            locations: vec![],
            phases: vec![],
            summary: None,
            sponsor: None,
        }
    }

    pub fn without_id(mut self) -> Self {
        self.nct_id = None;
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn condition(mut self, condition: &str) -> Self {
        self.conditions.push(condition.to_string());
        self
    }

    pub fn eligibility(mut self, text: &str) -> Self {
        self.eligibility = Some(text.to_string());
        self
    }

    pub fn ages(mut self, min: Option<&str>, max: Option<&str>) -> Self {
        self.min_age = min.map(String::from);
        self.max_age = max.map(String::from);
        self
    }

    pub fn location(mut self, facility: &str, city: &str, country: &str) -> Self {
        self.locations.push((facility.into(), city.into(), country.into()));
        self
    }

    pub fn phase(mut self, phase: &str) -> Self {
        self.phases.push(phase.to_string());
        self
    }

    pub fn summary(mut self, text: &str) -> Self {
        self.summary = Some(text.to_string());
        self
    }

    pub fn sponsor(mut self, name: &str) -> Self {
        self.sponsor = Some(name.to_string());
        self
    }

    pub fn build(self) -> Value {
        let mut ident = json!({});
        if let Some(id) = self.nct_id {
            ident["nctId"] = json!(id);
        }
        if let Some(title) = self.title {
            ident["briefTitle"] = json!(title);
        }

        let mut eligibility = json!({});
        if let Some(text) = self.eligibility {
            eligibility["eligibilityCriteria"] = json!(text);
        }
        if let Some(min) = self.min_age {
            eligibility["minimumAge"] = json!(min);
        }
        if let Some(max) = self.max_age {
            eligibility["maximumAge"] = json!(max);
        }

        let locations: Vec<Value> = self
            .locations
            .into_iter()
            .map(|(facility, city, country)| json!({ "facility": facility, "city": city, "country": country }))
            .collect();

        let mut protocol = json!({
            "identificationModule": ident,
            "conditionsModule": { "conditions": self.conditions },
            "eligibilityModule": eligibility,
            "contactsLocationsModule": { "locations": locations },
            "designModule": { "phases": self.phases },
        });
        if let Some(status) = self.status {
            protocol["statusModule"] = json!({ "overallStatus": status });
        }
        if let Some(summary) = self.summary {
            protocol["descriptionModule"] = json!({ "briefSummary": summary });
        }
        if let Some(sponsor) = self.sponsor {
            protocol["sponsorCollaboratorsModule"] = json!({ "leadSponsor": { "name": sponsor } });
        }

        json!({ "protocolSection": protocol })
    }
}

/// A registry page object holding `studies`.
pub fn page(studies: Vec<Value>) -> Value {
    json!({ "studies": studies })
}

/// A typical recurrent-glioblastoma phase 2 study recruiting in the UK.
pub fn uk_recurrent_gbm(nct_id: &str) -> StudyBuilder {
    StudyBuilder::new(nct_id, "Phase 2 study in recurrent glioblastoma")
        .condition("Glioblastoma")
        .eligibility("Inclusion Criteria:\n- Recurrent glioblastoma after standard therapy\n- Age 18 or older")
        .ages(Some("18 Years"), None)
        .location("The Royal Marsden", "London", "United Kingdom")
        .phase("PHASE2")
        .sponsor("Cancer Research UK")
}
