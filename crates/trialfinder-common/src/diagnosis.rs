//! Neuro-oncology diagnosis catalogue and the text matching shared by
//! query building and scoring.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, OnceLock};

// ---------------------------------------------------------------------------
// Diagnosis
// ---------------------------------------------------------------------------

/// Primary diagnosis category selected for a search.
///
/// Known categories expand to registry synonyms; anything else is searched
/// verbatim through [`Diagnosis::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Diagnosis {
    Glioblastoma,
    DiffuseMidlineGlioma,
    AnaplasticAstrocytoma,
    Astrocytoma,
    Oligodendroglioma,
    Meningioma,
    Medulloblastoma,
    Ependymoma,
    SpinalCordTumor,
    Other(String),
}

/// Fallback terms when no usable diagnosis was given.
const GENERIC_TERMS: &[&str] = &["brain tumor", "CNS tumor", "spinal cord tumor"];

impl Diagnosis {
    pub const KNOWN: [Diagnosis; 9] = [
        Diagnosis::Glioblastoma,
        Diagnosis::DiffuseMidlineGlioma,
        Diagnosis::AnaplasticAstrocytoma,
        Diagnosis::Astrocytoma,
        Diagnosis::Oligodendroglioma,
        Diagnosis::Meningioma,
        Diagnosis::Medulloblastoma,
        Diagnosis::Ependymoma,
        Diagnosis::SpinalCordTumor,
    ];

    /// Parse a label case-insensitively; unknown labels become `Other`.
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        Self::KNOWN
            .iter()
            .find(|d| d.label().eq_ignore_ascii_case(trimmed))
            .cloned()
            .unwrap_or_else(|| Diagnosis::Other(trimmed.to_string()))
    }

    pub fn label(&self) -> &str {
        match self {
            Diagnosis::Glioblastoma          => "Glioblastoma",
            Diagnosis::DiffuseMidlineGlioma  => "Diffuse midline glioma",
            Diagnosis::AnaplasticAstrocytoma => "Anaplastic astrocytoma",
            Diagnosis::Astrocytoma           => "Astrocytoma",
            Diagnosis::Oligodendroglioma     => "Oligodendroglioma",
            Diagnosis::Meningioma            => "Meningioma",
            Diagnosis::Medulloblastoma       => "Medulloblastoma",
            Diagnosis::Ependymoma            => "Ependymoma",
            Diagnosis::SpinalCordTumor       => "Spinal cord tumor",
            Diagnosis::Other(label)          => label,
        }
    }

    /// Registry search terms for this diagnosis, most specific first.
    pub fn search_terms(&self) -> Vec<String> {
        let terms: &[&str] = match self {
            Diagnosis::Glioblastoma          => &["glioblastoma", "GBM", "glioblastoma multiforme"],
            Diagnosis::DiffuseMidlineGlioma  => &["diffuse midline glioma", "DMG", "H3 K27M"],
            Diagnosis::AnaplasticAstrocytoma => &["anaplastic astrocytoma", "grade 3 astrocytoma"],
            Diagnosis::Astrocytoma           => &["astrocytoma", "grade 2 astrocytoma", "grade 4 astrocytoma"],
            Diagnosis::Oligodendroglioma     => &["oligodendroglioma", "1p19q codeleted"],
            Diagnosis::Meningioma            => &["meningioma"],
            Diagnosis::Medulloblastoma       => &["medulloblastoma"],
            Diagnosis::Ependymoma            => &["ependymoma"],
            Diagnosis::SpinalCordTumor       => &["spinal cord tumor", "spinal cord neoplasm"],
            Diagnosis::Other(label) => {
                let label = label.trim();
                if label.is_empty() || label.eq_ignore_ascii_case("other") {
                    GENERIC_TERMS
                } else {
                    return vec![label.to_string()];
                }
            }
        };
        terms.iter().map(|t| t.to_string()).collect()
    }
}

impl Default for Diagnosis {
    fn default() -> Self {
        Diagnosis::Glioblastoma
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for Diagnosis {
    fn from(label: String) -> Self {
        Diagnosis::parse(&label)
    }
}

impl From<Diagnosis> for String {
    fn from(d: Diagnosis) -> Self {
        d.label().to_string()
    }
}

// ---------------------------------------------------------------------------
// Disease setting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiseaseSetting {
    #[serde(alias = "Recurrent")]
    Recurrent,
    #[serde(alias = "Newly diagnosed", alias = "newly-diagnosed")]
    NewlyDiagnosed,
}

impl DiseaseSetting {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "recurrent" | "relapsed" => Some(DiseaseSetting::Recurrent),
            "newly diagnosed" | "new" | "newly" => Some(DiseaseSetting::NewlyDiagnosed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiseaseSetting::Recurrent      => "recurrent",
            DiseaseSetting::NewlyDiagnosed => "newly diagnosed",
        }
    }

    /// Phrases that signal this setting in eligibility or summary text.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            DiseaseSetting::Recurrent      => &["recurrent", "recurrence", "relapsed"],
            DiseaseSetting::NewlyDiagnosed => &["newly diagnosed", "newly-diagnosed"],
        }
    }

    /// Phrases that signal this setting only when they appear in a title.
    /// Eligibility text routinely says "prior adjuvant ..." for recurrent
    /// disease, so "adjuvant" is not trusted outside the title.
    pub fn title_keywords(&self) -> &'static [&'static str] {
        match self {
            DiseaseSetting::Recurrent      => &[],
            DiseaseSetting::NewlyDiagnosed => &["adjuvant"],
        }
    }
}

impl fmt::Display for DiseaseSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Text matching
// ---------------------------------------------------------------------------

/// Word-bounded patterns compiled so far, keyed by lower-cased term.
fn term_patterns() -> &'static Mutex<HashMap<String, Regex>> {
    static PATTERNS: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();
    PATTERNS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn term_pattern(term: &str) -> Option<Regex> {
    let key = term.to_lowercase();
    let mut patterns = term_patterns().lock().unwrap_or_else(|e| e.into_inner());
    if let Some(re) = patterns.get(&key) {
        return Some(re.clone());
    }
    let re = Regex::new(&format!(r"(?i)(?:^|\W){}(?:$|\W)", regex::escape(term))).ok()?;
    patterns.insert(key, re.clone());
    Some(re)
}

/// Case-insensitive, word-bounded search for `term` in `text`.
///
/// Boundaries are "start/end of text or a non-word character", so terms
/// that themselves end in punctuation (e.g. "ECOG 0-1") still match.
/// Each distinct term is compiled once per process.
pub fn mentions(text: &str, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() || text.is_empty() {
        return false;
    }
    term_pattern(term).is_some_and(|re| re.is_match(text))
}

/// Registry spelling for common country aliases.
fn country_alias(lowered: &str) -> Option<&'static str> {
    match lowered.trim_end_matches('.') {
        "uk" | "u.k" | "great britain" | "britain" | "england" | "scotland" | "wales"
        | "northern ireland" => Some("United Kingdom"),
        "us" | "u.s" | "usa" | "u.s.a" | "america" => Some("United States"),
        "south korea" | "korea" => Some("Korea, Republic of"),
        _ => None,
    }
}

/// Lower-cased country name with common aliases folded together.
pub fn canonical_country(country: &str) -> String {
    let lowered = country.trim().to_lowercase();
    match country_alias(&lowered) {
        Some(name) => name.to_lowercase(),
        None => lowered,
    }
}

/// Country as the registry spells it: aliases resolved, other input trimmed.
pub fn registry_country(country: &str) -> String {
    let trimmed = country.trim();
    country_alias(&trimmed.to_lowercase())
        .map(String::from)
        .unwrap_or_else(|| trimmed.to_string())
}

/// Whether a site country satisfies the patient's requested country.
/// Names must agree exactly once aliases are folded, so "Niger" never
/// matches "Nigeria".
pub fn country_matches(requested: &str, site_country: &str) -> bool {
    let requested = canonical_country(requested);
    !requested.is_empty() && canonical_country(site_country) == requested
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_label_case_insensitive() {
        assert_eq!(Diagnosis::parse("glioblastoma"), Diagnosis::Glioblastoma);
        assert_eq!(Diagnosis::parse(" Diffuse Midline Glioma "), Diagnosis::DiffuseMidlineGlioma);
    }

    #[test]
    fn test_unknown_diagnosis_searches_verbatim() {
        let d = Diagnosis::parse("Pineoblastoma");
        assert_eq!(d, Diagnosis::Other("Pineoblastoma".to_string()));
        assert_eq!(d.search_terms(), vec!["Pineoblastoma".to_string()]);
    }

    #[test]
    fn test_other_falls_back_to_generic_terms() {
        let terms = Diagnosis::parse("Other").search_terms();
        assert!(terms.contains(&"brain tumor".to_string()));
    }

    #[test]
    fn test_diagnosis_serde_roundtrip_uses_label() {
        let json = serde_json::to_string(&Diagnosis::Meningioma).unwrap();
        assert_eq!(json, "\"Meningioma\"");
        let back: Diagnosis = serde_json::from_str("\"medulloblastoma\"").unwrap();
        assert_eq!(back, Diagnosis::Medulloblastoma);
    }

    #[test]
    fn test_setting_parse() {
        assert_eq!(DiseaseSetting::parse("Recurrent"), Some(DiseaseSetting::Recurrent));
        assert_eq!(DiseaseSetting::parse("newly-diagnosed"), Some(DiseaseSetting::NewlyDiagnosed));
        assert_eq!(DiseaseSetting::parse("adjuvant"), None);
    }

    #[test]
    fn test_mentions_is_word_bounded() {
        assert!(mentions("Recurrent Glioblastoma", "glioblastoma"));
        assert!(mentions("Patients with GBM.", "gbm"));
        assert!(!mentions("GBMX cohort", "GBM"));
        assert!(mentions("Requires ECOG 0-1 at baseline", "ECOG 0-1"));
        assert!(!mentions("", "glioblastoma"));
    }

    #[test]
    fn test_country_aliases() {
        assert!(country_matches("UK", "United Kingdom"));
        assert!(country_matches("united kingdom", "United Kingdom"));
        assert!(country_matches("USA", "United States"));
        assert!(!country_matches("France", "United Kingdom"));
        assert!(!country_matches("", "United Kingdom"));
    }

    #[test]
    fn test_country_match_is_whole_name() {
        assert!(!country_matches("Niger", "Nigeria"));
        assert!(!country_matches("Guinea", "Papua New Guinea"));
        assert!(country_matches("Niger", "niger"));
        assert!(country_matches("South Korea", "Korea, Republic of"));
    }

    #[test]
    fn test_registry_country_resolves_aliases() {
        assert_eq!(registry_country("UK"), "United Kingdom");
        assert_eq!(registry_country(" usa "), "United States");
        assert_eq!(registry_country(" Norway "), "Norway");
    }

    #[test]
    fn test_mentions_reuses_compiled_pattern() {
        assert!(mentions("Phase 2 Temozolomide study", "temozolomide"));
        assert!(mentions("adjuvant TEMOZOLOMIDE", "Temozolomide"));
        let patterns = term_patterns().lock().unwrap();
        assert!(patterns.contains_key("temozolomide"));
    }

    #[test]
    fn test_adjuvant_is_a_title_only_signal() {
        assert!(!DiseaseSetting::NewlyDiagnosed.keywords().contains(&"adjuvant"));
        assert_eq!(DiseaseSetting::NewlyDiagnosed.title_keywords(), &["adjuvant"]);
        assert!(DiseaseSetting::Recurrent.title_keywords().is_empty());
    }
}
