//! Free-form age bound parsing ("18 Years", "6 Months", "N/A", …).

use regex::Regex;
use std::sync::OnceLock;

use super::raw_field::RawField;

fn age_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(years?|yrs?|y|months?|mos?|weeks?|wks?|days?|hours?|minutes?)?\b")
            .unwrap()
    })
}

/// Parse an age bound into years. `None` means an open bound.
pub fn parse_age_years(field: RawField<'_>) -> Option<f64> {
    match field {
        RawField::Text(s) => parse_age_text(s),
        RawField::Number(n) if n.is_finite() && n >= 0.0 => Some(n),
        RawField::Object(_) => parse_age_years(field.get("value")),
        _ => None,
    }
}

/// Parse text such as "18 Years" or "6 Months"; a bare number is read as years.
pub fn parse_age_text(raw: &str) -> Option<f64> {
    let caps = age_regex().captures(raw.trim())?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps
        .get(2)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();

    let years = match unit.chars().next() {
        Some('m') if unit.starts_with("mi") => value / (365.25 * 24.0 * 60.0),
        Some('m') => value / 12.0,
        Some('w') => value / 52.1775,
        Some('d') => value / 365.25,
        Some('h') => value / (365.25 * 24.0),
        _ => value,
    };
    Some(years)
}
