//! Registry JSON → [`TrialRecord`] normalisation.
//!
//! - `raw_field`: tagged view over loosely-typed JSON fields
//! - `age`: free-form age bound parsing
//!
//! A bad entry is skipped and counted, never raised. Only a page that is
//! not a JSON object or array fails the whole call.

pub mod age;
pub mod raw_field;

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, info};

use trialfinder_common::{Result, TrialFinderError};

use crate::dedup::{DedupIndex, DedupResult};
use crate::models::{Location, RawTrialPage, SkipCause, SkipDiagnostics, TrialRecord, TrialStatus};
pub use age::{parse_age_text, parse_age_years};
pub use raw_field::RawField;
use raw_field::first_child;

// ── Field paths (v2 nested shape first, flat aliases after) ──────────────────

const ID_PATHS: &[&[&str]] = &[
    &["protocolSection", "identificationModule", "nctId"],
    &["identifier"],
    &["nctId"],
];
const TITLE_PATHS: &[&[&str]] = &[
    &["protocolSection", "identificationModule", "briefTitle"],
    &["protocolSection", "identificationModule", "officialTitle"],
    &["briefTitle"],
    &["officialTitle"],
    &["title"],
];
const STATUS_PATHS: &[&[&str]] = &[
    &["protocolSection", "statusModule", "overallStatus"],
    &["overallStatus"],
    &["status"],
];
const CONDITION_PATHS: &[&[&str]] = &[
    &["protocolSection", "conditionsModule", "conditions"],
    &["conditions"],
];
const ELIGIBILITY_PATHS: &[&[&str]] = &[
    &["protocolSection", "eligibilityModule", "eligibilityCriteria"],
    &["protocolSection", "eligibilityModule", "criteria"],
    &["protocolSection", "eligibilityModule"],
    &["eligibilityCriteria"],
];
const MIN_AGE_PATHS: &[&[&str]] = &[
    &["protocolSection", "eligibilityModule", "minimumAge"],
    &["minimumAge"],
];
const MAX_AGE_PATHS: &[&[&str]] = &[
    &["protocolSection", "eligibilityModule", "maximumAge"],
    &["maximumAge"],
];
const LOCATION_PATHS: &[&[&str]] = &[
    &["protocolSection", "contactsLocationsModule", "locations"],
    &["locations"],
];
const PHASE_PATHS: &[&[&str]] = &[
    &["protocolSection", "designModule", "phases"],
    &["phases"],
    &["phase"],
];
const SUMMARY_PATHS: &[&[&str]] = &[
    &["protocolSection", "descriptionModule", "briefSummary"],
    &["briefSummary"],
];
const SPONSOR_PATHS: &[&[&str]] = &[
    &["protocolSection", "sponsorCollaboratorsModule", "leadSponsor", "name"],
    &["leadSponsor", "name"],
    &["sponsor"],
];

fn nct_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^NCT\d{8}$").unwrap())
}

/// Normalise every study on every page.
///
/// Duplicates (same NCT id) keep the first valid occurrence and are counted
/// separately from skips, so `records + skipped + duplicates == total_fetched`.
pub fn normalize(pages: &[RawTrialPage]) -> Result<(Vec<TrialRecord>, SkipDiagnostics)> {
    let mut diagnostics = SkipDiagnostics::default();
    let mut index = DedupIndex::new();
    let mut records = Vec::new();

    for (page_no, page) in pages.iter().enumerate() {
        let studies = page_studies(page).map_err(|e| {
            TrialFinderError::MalformedResponse(format!("page {}: {}", page_no + 1, e))
        })?;

        for study in studies {
            diagnostics.total_fetched += 1;
            match normalize_study(study) {
                Ok(record) => match index.check_and_insert(&record.nct_id) {
                    DedupResult::New => records.push(record),
                    DedupResult::DuplicateId(id) => {
                        debug!(nct_id = %id, "Dropping duplicate trial");
                        diagnostics.record_duplicate();
                    }
                },
                Err(cause) => {
                    debug!(page = page_no + 1, %cause, "Skipping malformed trial entry");
                    diagnostics.record_skip(cause);
                }
            }
        }
    }

    info!(
        total = diagnostics.total_fetched,
        kept = records.len(),
        skipped = diagnostics.skipped,
        duplicates = diagnostics.duplicates,
        "Normalised registry pages"
    );
    Ok((records, diagnostics))
}

/// Study entries carried by one page.
fn page_studies(page: &RawTrialPage) -> std::result::Result<&[Value], String> {
    match &page.0 {
        Value::Array(items) => Ok(items.as_slice()),
        Value::Object(map) => match map.get("studies") {
            None | Some(Value::Null) => Ok(&[]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(_) => Err("`studies` is not an array".to_string()),
        },
        other => Err(format!("expected a JSON object or array, got {}", json_kind(other))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object",
    }
}

/// Convert one study, or report why it has to be skipped.
pub fn normalize_study(study: &Value) -> std::result::Result<TrialRecord, SkipCause> {
    if !study.is_object() {
        return Err(SkipCause::NotAnObject);
    }

    let nct_id = required(
        RawField::lookup(study, ID_PATHS),
        SkipCause::MissingIdentifier,
        SkipCause::MalformedIdentifier,
    )?
    .to_uppercase();
    if !nct_regex().is_match(&nct_id) {
        return Err(SkipCause::MalformedIdentifier);
    }

    let title = required(
        RawField::lookup(study, TITLE_PATHS),
        SkipCause::MissingTitle,
        SkipCause::MalformedTitle,
    )?
    .to_string();

    let status = TrialStatus::parse(required(
        RawField::lookup(study, STATUS_PATHS),
        SkipCause::MissingStatus,
        SkipCause::MalformedStatus,
    )?);

    Ok(TrialRecord {
        nct_id,
        title,
        status,
        conditions: unique_ordered(RawField::lookup(study, CONDITION_PATHS).as_text_list()),
        eligibility: RawField::lookup(study, ELIGIBILITY_PATHS).as_text(),
        min_age_years: age::parse_age_years(RawField::lookup(study, MIN_AGE_PATHS)),
        max_age_years: age::parse_age_years(RawField::lookup(study, MAX_AGE_PATHS)),
        locations: locations(RawField::lookup(study, LOCATION_PATHS)),
        phases: RawField::lookup(study, PHASE_PATHS)
            .as_text_list()
            .into_iter()
            .map(|p| p.to_uppercase())
            .collect(),
        brief_summary: RawField::lookup(study, SUMMARY_PATHS).as_text(),
        sponsor: RawField::lookup(study, SPONSOR_PATHS).as_text(),
    })
}

/// A required field must be non-blank text.
fn required<'a>(
    field: RawField<'a>,
    missing: SkipCause,
    malformed: SkipCause,
) -> std::result::Result<&'a str, SkipCause> {
    if field.is_absent() {
        return Err(missing);
    }
    field.text().ok_or(malformed)
}

fn locations(field: RawField<'_>) -> Vec<Location> {
    field
        .items()
        .into_iter()
        .filter(|item| matches!(item, RawField::Object(_)))
        .map(|item| Location {
            facility: first_child(&item, &["facility", "locationFacility", "name"]).as_text(),
            city: first_child(&item, &["city", "locationCity"]).as_text(),
            country: first_child(&item, &["country", "locationCountry"]).as_text(),
        })
        .filter(|loc| loc.facility.is_some() || loc.city.is_some() || loc.country.is_some())
        .collect()
}

/// Keep the first spelling of each value, comparing case-insensitively.
fn unique_ordered(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}
