//! Data models for the retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use trialfinder_common::{Diagnosis, DiseaseSetting};

// ── Query ─────────────────────────────────────────────────────────────────────

/// Filter parameters for one search. Immutable once built; the builder
/// methods consume and return `self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub diagnosis: Diagnosis,
    /// Extra free-text keywords (comma-separated on the CLI).
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub setting: Option<DiseaseSetting>,
    #[serde(default)]
    pub age: Option<u32>,
    /// Karnofsky performance status, 0–100.
    #[serde(default)]
    pub performance_status: Option<u32>,
    #[serde(default = "default_statuses")]
    pub statuses: Vec<TrialStatus>,
}

fn default_statuses() -> Vec<TrialStatus> {
    vec![TrialStatus::Recruiting, TrialStatus::NotYetRecruiting]
}

impl QueryParams {
    pub fn new(diagnosis: Diagnosis) -> Self {
        Self {
            diagnosis,
            keywords: vec![],
            country: None,
            setting: None,
            age: None,
            performance_status: None,
            statuses: default_statuses(),
        }
    }

    pub fn with_keywords(mut self, keywords: &str) -> Self {
        self.keywords = parse_keywords(keywords);
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        let country = country.into();
        self.country = if country.trim().is_empty() { None } else { Some(country) };
        self
    }

    pub fn with_setting(mut self, setting: DiseaseSetting) -> Self {
        self.setting = Some(setting);
        self
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_performance_status(mut self, kps: u32) -> Self {
        self.performance_status = Some(kps);
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<TrialStatus>) -> Self {
        self.statuses = statuses;
        self
    }

    /// Country with surrounding whitespace removed, if any was given.
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// Statuses to request; an empty filter falls back to the recruiting pair.
    pub fn effective_statuses(&self) -> Vec<TrialStatus> {
        if self.statuses.is_empty() {
            return default_statuses();
        }
        let mut statuses = self.statuses.clone();
        statuses.sort_by(|a, b| a.as_api_str().cmp(b.as_api_str()));
        statuses.dedup();
        statuses
    }

    /// Canonical cache key: fixed field order, trimmed and lower-cased text,
    /// sorted keyword and status lists.
    pub fn cache_key(&self) -> CacheKey {
        let mut keywords: Vec<String> = self
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        keywords.sort();
        keywords.dedup();

        let statuses = self.effective_statuses();
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_api_str()).collect();

        let opt_num = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();

        CacheKey(format!(
            "diagnosis={}|keywords={}|country={}|setting={}|age={}|kps={}|statuses={}",
            self.diagnosis.label().trim().to_lowercase(),
            keywords.join(","),
            self.country().map(str::to_lowercase).unwrap_or_default(),
            self.setting.map(|s| s.as_str()).unwrap_or_default(),
            opt_num(self.age),
            opt_num(self.performance_status),
            statuses.join(","),
        ))
    }
}

/// Split a comma-separated keyword list, dropping blanks.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Canonicalised form of [`QueryParams`] used to key the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Registry payloads ─────────────────────────────────────────────────────────

/// One page of registry JSON, exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTrialPage(pub serde_json::Value);

impl RawTrialPage {
    /// Token for the next page; absent, null or empty means last page.
    pub fn next_page_token(&self) -> Option<&str> {
        self.0
            .get("nextPageToken")
            .and_then(|t| t.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

// ── Trial status ──────────────────────────────────────────────────────────────

/// Overall recruitment status as reported by ClinicalTrials.gov.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrialStatus {
    Recruiting,
    NotYetRecruiting,
    EnrollingByInvitation,
    ActiveNotRecruiting,
    Suspended,
    Terminated,
    Completed,
    Withdrawn,
    Other(String),
}

impl TrialStatus {
    pub fn parse(raw: &str) -> Self {
        let code = raw.trim().to_uppercase().replace([' ', '-', ','], "_");
        match code.as_str() {
            "RECRUITING"              => TrialStatus::Recruiting,
            "NOT_YET_RECRUITING"      => TrialStatus::NotYetRecruiting,
            "ENROLLING_BY_INVITATION" => TrialStatus::EnrollingByInvitation,
            "ACTIVE_NOT_RECRUITING"
            | "ACTIVE__NOT_RECRUITING" => TrialStatus::ActiveNotRecruiting,
            "SUSPENDED"               => TrialStatus::Suspended,
            "TERMINATED"              => TrialStatus::Terminated,
            "COMPLETED"               => TrialStatus::Completed,
            "WITHDRAWN"               => TrialStatus::Withdrawn,
            _                         => TrialStatus::Other(code),
        }
    }

    pub fn as_api_str(&self) -> &str {
        match self {
            TrialStatus::Recruiting            => "RECRUITING",
            TrialStatus::NotYetRecruiting      => "NOT_YET_RECRUITING",
            TrialStatus::EnrollingByInvitation => "ENROLLING_BY_INVITATION",
            TrialStatus::ActiveNotRecruiting   => "ACTIVE_NOT_RECRUITING",
            TrialStatus::Suspended             => "SUSPENDED",
            TrialStatus::Terminated            => "TERMINATED",
            TrialStatus::Completed             => "COMPLETED",
            TrialStatus::Withdrawn             => "WITHDRAWN",
            TrialStatus::Other(code)           => code,
        }
    }

    /// Human-readable form, e.g. `RECRUITING` → `Recruiting`.
    pub fn display_name(&self) -> String {
        self.as_api_str()
            .split('_')
            .filter(|w| !w.is_empty())
            .enumerate()
            .map(|(i, w)| {
                let lower = w.to_lowercase();
                if i > 0 {
                    return lower;
                }
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<String> for TrialStatus {
    fn from(raw: String) -> Self {
        TrialStatus::parse(&raw)
    }
}

impl From<TrialStatus> for String {
    fn from(s: TrialStatus) -> Self {
        s.as_api_str().to_string()
    }
}

// ── Normalised trial ──────────────────────────────────────────────────────────

/// One trial site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub facility: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl Location {
    /// "Facility, City, Country" with missing parts left out.
    pub fn describe(&self) -> String {
        [&self.facility, &self.city, &self.country]
            .iter()
            .filter_map(|p| p.as_deref())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A trial record in the uniform internal shape.
///
/// `nct_id`, `title` and `status` are always present; everything else
/// defaults to `None`/empty when the registry omitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub nct_id: String,
    pub title: String,
    pub status: TrialStatus,
    pub conditions: Vec<String>,
    pub eligibility: Option<String>,
    pub min_age_years: Option<f64>,
    pub max_age_years: Option<f64>,
    pub locations: Vec<Location>,
    pub phases: Vec<String>,
    pub brief_summary: Option<String>,
    pub sponsor: Option<String>,
}

impl TrialRecord {
    /// Minimal record, mostly useful for tests and fixtures.
    pub fn new(nct_id: impl Into<String>, title: impl Into<String>, status: TrialStatus) -> Self {
        Self {
            nct_id: nct_id.into(),
            title: title.into(),
            status,
            conditions: vec![],
            eligibility: None,
            min_age_years: None,
            max_age_years: None,
            locations: vec![],
            phases: vec![],
            brief_summary: None,
            sponsor: None,
        }
    }

    pub fn url(&self) -> String {
        format!("https://clinicaltrials.gov/study/{}", self.nct_id)
    }

    pub fn phase_label(&self) -> String {
        self.phases.join(", ")
    }

    /// e.g. "18–75 years", "18+ years", "up to 21 years", "any age".
    pub fn age_range_label(&self) -> String {
        let fmt = |v: f64| {
            if v.fract() == 0.0 { format!("{}", v as i64) } else { format!("{:.1}", v) }
        };
        match (self.min_age_years, self.max_age_years) {
            (Some(min), Some(max)) => format!("{}–{} years", fmt(min), fmt(max)),
            (Some(min), None)      => format!("{}+ years", fmt(min)),
            (None, Some(max))      => format!("up to {} years", fmt(max)),
            (None, None)           => "any age".to_string(),
        }
    }

    /// Whether an age in years lies inside the (possibly open) bounds.
    pub fn accepts_age(&self, age: f64) -> bool {
        self.min_age_years.map_or(true, |min| age >= min)
            && self.max_age_years.map_or(true, |max| age <= max)
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Why a raw entry was dropped during normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipCause {
    NotAnObject,
    MissingIdentifier,
    MalformedIdentifier,
    MissingTitle,
    MalformedTitle,
    MissingStatus,
    MalformedStatus,
}

impl SkipCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipCause::NotAnObject         => "not an object",
            SkipCause::MissingIdentifier   => "missing identifier",
            SkipCause::MalformedIdentifier => "malformed identifier",
            SkipCause::MissingTitle        => "missing title",
            SkipCause::MalformedTitle      => "malformed title",
            SkipCause::MissingStatus       => "missing status",
            SkipCause::MalformedStatus     => "malformed status",
        }
    }
}

impl fmt::Display for SkipCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts of what normalisation dropped, recomputed on every fetch.
///
/// `total_fetched == records + skipped + duplicates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipDiagnostics {
    pub total_fetched: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub reasons: BTreeMap<String, usize>,
}

impl SkipDiagnostics {
    pub fn record_skip(&mut self, cause: SkipCause) {
        self.skipped += 1;
        *self.reasons.entry(cause.as_str().to_string()).or_insert(0) += 1;
    }

    pub fn record_duplicate(&mut self) {
        self.duplicates += 1;
    }

    pub fn count_for(&self, cause: SkipCause) -> usize {
        self.reasons.get(cause.as_str()).copied().unwrap_or(0)
    }

    pub fn kept(&self) -> usize {
        self.total_fetched
            .saturating_sub(self.skipped)
            .saturating_sub(self.duplicates)
    }
}
