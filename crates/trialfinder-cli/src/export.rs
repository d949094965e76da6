//! CSV / JSON export of ranked trials.

use serde::Serialize;
use std::io::Write;
use std::path::Path;

use trialfinder_common::diagnosis::country_matches;
use trialfinder_ingestion::TrialRecord;
use trialfinder_ranker::ScoredTrial;

/// One flat CSV row. Field order is the column order.
#[derive(Debug, Serialize)]
pub struct ExportRow {
    pub score: f64,
    pub title: String,
    pub nct: String,
    pub url: String,
    pub status: String,
    pub phases: String,
    pub conditions: String,
    pub site: String,
    pub sponsor: String,
    pub reasons: String,
}

impl ExportRow {
    pub fn new(trial: &ScoredTrial, country: Option<&str>) -> Self {
        let r = &trial.record;
        Self {
            score: trial.score,
            title: r.title.clone(),
            nct: r.nct_id.clone(),
            url: r.url(),
            status: r.status.display_name(),
            phases: r.phase_label(),
            conditions: r.conditions.join(", "),
            site: site_label(r, country),
            sponsor: r.sponsor.clone().unwrap_or_default(),
            reasons: trial.reasons.join("; "),
        }
    }
}

/// "City, Country" of the first site in the patient's country, or of the
/// first site when none matches.
pub fn site_label(record: &TrialRecord, country: Option<&str>) -> String {
    let preferred = country.and_then(|wanted| {
        record.locations.iter().find(|l| {
            l.country.as_deref().is_some_and(|c| country_matches(wanted, c))
        })
    });
    preferred
        .or_else(|| record.locations.first())
        .map(|l| {
            [l.city.as_deref(), l.country.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

pub fn write_csv<W: Write>(out: W, trials: &[ScoredTrial], country: Option<&str>) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for trial in trials {
        writer.serialize(ExportRow::new(trial, country))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_csv(path: &Path, trials: &[ScoredTrial], country: Option<&str>) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(file, trials, country)
}

pub fn save_json(path: &Path, trials: &[ScoredTrial]) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, trials)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use trialfinder_ingestion::{Location, TrialStatus};

    fn trial() -> ScoredTrial {
        let mut r = TrialRecord::new("NCT01234567", "Trial, with comma", TrialStatus::NotYetRecruiting);
        r.phases = vec!["PHASE2".into(), "PHASE3".into()];
        r.conditions = vec!["Glioblastoma".into()];
        r.locations = vec![
            Location { facility: None, city: Some("Paris".into()), country: Some("France".into()) },
            Location { facility: None, city: Some("Leeds".into()), country: Some("United Kingdom".into()) },
        ];
        ScoredTrial { record: r, score: 42.0, reasons: vec!["A".into(), "B".into()] }
    }

    #[test]
    fn test_site_prefers_patient_country() {
        let t = trial();
        assert_eq!(site_label(&t.record, Some("UK")), "Leeds, United Kingdom");
        assert_eq!(site_label(&t.record, None), "Paris, France");
    }

    #[test]
    fn test_csv_header_and_row() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[trial()], Some("uk")).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("score,title,nct,url,status,phases,conditions,site,sponsor,reasons")
        );
        assert_eq!(
            lines.next(),
            Some("42.0,\"Trial, with comma\",NCT01234567,https://clinicaltrials.gov/study/NCT01234567,Not yet recruiting,\"PHASE2, PHASE3\",Glioblastoma,\"Leeds, United Kingdom\",,A; B")
        );
    }
}
