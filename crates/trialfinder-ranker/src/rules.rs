//! Scoring rules.
//!
//! Each rule pairs a criterion with a weight. Evaluating a criterion yields
//! one reason per match; the rule contributes `weight × matches`. A
//! criterion that cannot be evaluated (missing field, unknown patient
//! value) simply does not match.

use trialfinder_common::diagnosis::{country_matches, mentions};
use trialfinder_common::DiseaseSetting;
use trialfinder_ingestion::{TrialRecord, TrialStatus};

use crate::patient::PatientFactors;
use crate::weights::WeightVector;

/// Sites listed in a country-match reason before "+N more".
const MAX_SITES_IN_REASON: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Diagnosis,
    AgeEligible,
    Setting,
    Country,
    Recruiting,
    NotYetRecruiting,
    Phase2,
    Phase3,
    Keywords,
    EcogRequirement,
    KarnofskyRequirement,
    PriorBevacizumab,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub criterion: Criterion,
    pub weight: f64,
}

/// The default rule table, in reason order.
pub fn rule_table(w: &WeightVector) -> Vec<Rule> {
    use Criterion::*;
    [
        (Diagnosis, w.diagnosis),
        (AgeEligible, w.age_eligible),
        (Setting, w.setting),
        (Country, w.country),
        (Recruiting, w.recruiting),
        (NotYetRecruiting, w.not_yet_recruiting),
        (Phase2, w.phase2),
        (Phase3, w.phase3),
        (Keywords, w.keyword),
        (EcogRequirement, w.ecog_penalty),
        (KarnofskyRequirement, w.karnofsky_penalty),
        (PriorBevacizumab, w.prior_bevacizumab_penalty),
    ]
    .into_iter()
    .map(|(criterion, weight)| Rule { criterion, weight })
    .collect()
}

/// Text views of a record shared by all criteria.
pub struct TrialText<'a> {
    record: &'a TrialRecord,
    eligibility: &'a str,
    summary: &'a str,
}

impl<'a> TrialText<'a> {
    pub fn new(record: &'a TrialRecord) -> Self {
        Self {
            record,
            eligibility: record.eligibility.as_deref().unwrap_or(""),
            summary: record.brief_summary.as_deref().unwrap_or(""),
        }
    }

    fn in_conditions(&self, term: &str) -> bool {
        self.record.conditions.iter().any(|c| mentions(c, term))
    }

    fn has_phase(&self, n: char) -> bool {
        self.record.phases.iter().any(|p| {
            let compact: String = p.to_uppercase().chars().filter(|c| !c.is_whitespace()).collect();
            compact
                .match_indices("PHASE")
                .any(|(i, _)| compact[i + 5..].starts_with(n))
        })
    }
}

impl Criterion {
    /// Reasons for every match of this criterion; empty when it does not apply.
    pub fn evaluate(&self, t: &TrialText<'_>, p: &PatientFactors) -> Vec<String> {
        let r = t.record;
        match self {
            Criterion::Diagnosis => p
                .diagnosis
                .search_terms()
                .into_iter()
                .find(|term| {
                    t.in_conditions(term) || mentions(&r.title, term) || mentions(t.summary, term)
                })
                .map(|term| vec![format!("Matches diagnosis keyword: {term}")])
                .unwrap_or_default(),

            Criterion::AgeEligible => match p.age {
                Some(age) if r.accepts_age(f64::from(age)) => {
                    vec![format!("Age-eligible ({})", r.age_range_label())]
                }
                _ => vec![],
            },

            Criterion::Setting => match p.setting {
                Some(setting)
                    if setting
                        .keywords()
                        .iter()
                        .any(|kw| mentions(t.eligibility, kw) || mentions(t.summary, kw))
                        || setting.title_keywords().iter().any(|kw| mentions(&r.title, kw)) =>
                {
                    vec![match setting {
                        DiseaseSetting::Recurrent => "Recurrent disease setting mentioned".to_string(),
                        DiseaseSetting::NewlyDiagnosed => "Newly diagnosed setting mentioned".to_string(),
                    }]
                }
                _ => vec![],
            },

            Criterion::Country => {
                let Some(wanted) = p.country.as_deref() else {
                    return vec![];
                };
                let sites: Vec<_> = r
                    .locations
                    .iter()
                    .filter(|l| l.country.as_deref().is_some_and(|c| country_matches(wanted, c)))
                    .collect();
                let Some(first) = sites.first() else {
                    return vec![];
                };
                let country = first.country.as_deref().unwrap_or(wanted);
                let mut listed: Vec<String> = sites
                    .iter()
                    .take(MAX_SITES_IN_REASON)
                    .map(|l| {
                        [l.facility.as_deref(), l.city.as_deref()]
                            .into_iter()
                            .flatten()
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .filter(|s| !s.is_empty())
                    .collect();
                if sites.len() > MAX_SITES_IN_REASON {
                    listed.push(format!("+{} more", sites.len() - MAX_SITES_IN_REASON));
                }
                if listed.is_empty() {
                    vec![format!("Site in {country}")]
                } else {
                    vec![format!("Site in {country}: {}", listed.join("; "))]
                }
            }

            Criterion::Recruiting => match r.status {
                TrialStatus::Recruiting => vec!["Currently recruiting".to_string()],
                _ => vec![],
            },

            Criterion::NotYetRecruiting => match r.status {
                TrialStatus::NotYetRecruiting => vec!["Not yet recruiting".to_string()],
                _ => vec![],
            },

            Criterion::Phase2 if t.has_phase('2') => vec!["Phase 2 study".to_string()],
            Criterion::Phase3 if t.has_phase('3') => vec!["Phase 3 study".to_string()],
            Criterion::Phase2 | Criterion::Phase3 => vec![],

            Criterion::Keywords => p
                .keywords
                .iter()
                .map(|kw| kw.trim())
                .filter(|kw| !kw.is_empty())
                .filter(|kw| mentions(&r.title, kw) || t.in_conditions(kw) || mentions(t.eligibility, kw))
                .map(|kw| format!("Mentions keyword: {kw}"))
                .collect(),

            Criterion::EcogRequirement => {
                let demands = ["ECOG 0-1", "ECOG 0–1"].iter().any(|term| mentions(t.eligibility, term));
                if demands && p.kps.map_or(true, |kps| kps < 80) {
                    vec!["Requires ECOG 0–1 (KPS ~≥80)".to_string()]
                } else {
                    vec![]
                }
            }

            Criterion::KarnofskyRequirement => {
                if mentions(t.eligibility, "Karnofsky") && p.kps.map_or(true, |kps| kps < 70) {
                    vec!["Requires KPS ≥70".to_string()]
                } else {
                    vec![]
                }
            }

            Criterion::PriorBevacizumab => {
                if p.prior_bevacizumab && mentions(t.eligibility, "no prior bevacizumab") {
                    vec!["Excludes prior bevacizumab".to_string()]
                } else {
                    vec![]
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialfinder_common::Diagnosis;
    use trialfinder_ingestion::Location;

    fn record() -> TrialRecord {
        let mut r = TrialRecord::new("NCT00000001", "Recurrent glioblastoma study", TrialStatus::Recruiting);
        r.phases = vec!["PHASE1".into(), "PHASE2".into()];
        r.eligibility = Some("ECOG 0-1. No prior bevacizumab.".into());
        r.locations = (0..5)
            .map(|i| Location {
                facility: Some(format!("Hospital {i}")),
                city: Some("London".into()),
                country: Some("United Kingdom".into()),
            })
            .collect();
        r
    }

    #[test]
    fn test_phase_detection() {
        let r = record();
        let t = TrialText::new(&r);
        assert!(t.has_phase('2'));
        assert!(!t.has_phase('3'));
    }

    #[test]
    fn test_country_reason_lists_three_sites() {
        let r = record();
        let p = PatientFactors { country: Some("UK".into()), ..Default::default() };
        let reasons = Criterion::Country.evaluate(&TrialText::new(&r), &p);
        assert_eq!(
            reasons,
            vec!["Site in United Kingdom: Hospital 0, London; Hospital 1, London; Hospital 2, London; +2 more".to_string()]
        );
    }

    #[test]
    fn test_penalties_need_patient_context() {
        let r = record();
        let t = TrialText::new(&r);
        let fit = PatientFactors { kps: Some(90), diagnosis: Diagnosis::Glioblastoma, ..Default::default() };
        assert!(Criterion::EcogRequirement.evaluate(&t, &fit).is_empty());
        assert!(Criterion::PriorBevacizumab.evaluate(&t, &fit).is_empty());

        let frail = PatientFactors { kps: None, prior_bevacizumab: true, ..Default::default() };
        assert_eq!(Criterion::EcogRequirement.evaluate(&t, &frail).len(), 1);
        assert_eq!(Criterion::PriorBevacizumab.evaluate(&t, &frail).len(), 1);
    }

    #[test]
    fn test_keywords_match_word_bounded() {
        let r = record();
        let p = PatientFactors { keywords: vec!["glioblastoma".into(), "blast".into()], ..Default::default() };
        assert_eq!(
            Criterion::Keywords.evaluate(&TrialText::new(&r), &p),
            vec!["Mentions keyword: glioblastoma".to_string()]
        );
    }

    #[test]
    fn test_prior_adjuvant_therapy_is_not_a_newly_diagnosed_signal() {
        let mut r = TrialRecord::new("NCT00000003", "Regorafenib for recurrent glioblastoma", TrialStatus::Recruiting);
        r.eligibility = Some("First recurrence after prior adjuvant temozolomide".into());
        let p = PatientFactors { setting: Some(DiseaseSetting::NewlyDiagnosed), ..Default::default() };
        assert!(Criterion::Setting.evaluate(&TrialText::new(&r), &p).is_empty());

        r.title = "Adjuvant vaccine after chemoradiation for glioblastoma".into();
        assert_eq!(
            Criterion::Setting.evaluate(&TrialText::new(&r), &p),
            vec!["Newly diagnosed setting mentioned".to_string()]
        );
    }

    #[test]
    fn test_country_reason_ignores_similarly_named_countries() {
        let mut r = TrialRecord::new("NCT00000004", "Glioma registry", TrialStatus::Recruiting);
        r.locations = vec![Location {
            facility: Some("Lagos University".into()),
            city: Some("Lagos".into()),
            country: Some("Nigeria".into()),
        }];
        let p = PatientFactors { country: Some("Niger".into()), ..Default::default() };
        assert!(Criterion::Country.evaluate(&TrialText::new(&r), &p).is_empty());
    }

    #[test]
    fn test_rule_table_follows_weights() {
        let table = rule_table(&WeightVector::default());
        assert_eq!(table.len(), 12);
        assert_eq!(table[0], Rule { criterion: Criterion::Diagnosis, weight: 30.0 });
        assert!(table.iter().filter(|r| r.weight < 0.0).count() == 3);
    }
}
