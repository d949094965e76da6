//! trialfinder — ranked neuro-oncology trial search against ClinicalTrials.gov.
//! Entry point for the command-line binary.

mod config;
mod export;

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trialfinder_common::diagnosis::country_matches;
use trialfinder_common::{Diagnosis, DiseaseSetting};
use trialfinder_ingestion::{QueryParams, SkipDiagnostics, TrialCache, TrialFetcher};
use trialfinder_ranker::{top_n, PatientFactors, ScoredTrial, Scorer, TrialSearch};

#[derive(Debug, Parser)]
#[command(name = "trialfinder", version, about = "Find and rank recruiting neuro-oncology trials on ClinicalTrials.gov")]
struct Args {
    /// Primary diagnosis (e.g. Glioblastoma, Meningioma, or free text)
    #[arg(long, default_value = "Glioblastoma")]
    diagnosis: String,

    /// Extra keywords, comma-separated
    #[arg(long, default_value = "")]
    keywords: String,

    /// Patient age in years
    #[arg(long)]
    age: Option<u32>,

    /// Karnofsky performance status (0-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    kps: Option<u32>,

    /// Disease setting: recurrent | newly-diagnosed
    #[arg(long, value_parser = parse_setting)]
    setting: Option<DiseaseSetting>,

    /// Country to search and score sites against
    #[arg(long)]
    country: Option<String>,

    /// Drop trials without a site in --country
    #[arg(long, requires = "country")]
    require_country: bool,

    /// Patient has received bevacizumab
    #[arg(long)]
    prior_bev: bool,

    /// Ignore cached results
    #[arg(long)]
    refresh: bool,

    /// Rows to print (defaults to output.top from the config)
    #[arg(long)]
    top: Option<usize>,

    /// Maximum registry pages to fetch
    #[arg(long)]
    pages: Option<usize>,

    /// Studies per registry page
    #[arg(long)]
    page_size: Option<usize>,

    /// Write all ranked trials as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write all ranked trials as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Config file (overrides TRIALFINDER_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_setting(raw: &str) -> Result<DiseaseSetting, String> {
    DiseaseSetting::parse(raw).ok_or_else(|| format!("unknown setting '{raw}' (use recurrent or newly-diagnosed)"))
}

impl Args {
    fn query(&self) -> QueryParams {
        let mut q = QueryParams::new(Diagnosis::parse(&self.diagnosis)).with_keywords(&self.keywords);
        if let Some(country) = &self.country {
            q = q.with_country(country.clone());
        }
        if let Some(setting) = self.setting {
            q = q.with_setting(setting);
        }
        if let Some(age) = self.age {
            q = q.with_age(age);
        }
        if let Some(kps) = self.kps {
            q = q.with_performance_status(kps);
        }
        q
    }
}

fn has_site_in(trial: &ScoredTrial, country: &str) -> bool {
    trial
        .record
        .locations
        .iter()
        .any(|l| l.country.as_deref().is_some_and(|c| country_matches(country, c)))
}

fn summary_line(diag: &SkipDiagnostics, shown: usize) -> String {
    format!(
        "Fetched {} studies; {} usable ({} skipped, {} duplicates), {} shown.",
        diag.total_fetched,
        diag.kept(),
        diag.skipped,
        diag.duplicates,
        shown
    )
}

fn print_trials(trials: &[ScoredTrial], country: Option<&str>, max_reasons: usize) {
    for (i, t) in trials.iter().enumerate() {
        let r = &t.record;
        println!("{:>2}. [{:>5.1}] {} — {}", i + 1, t.score, r.nct_id, r.title);
        println!(
            "      {} | {} | {}",
            r.status.display_name(),
            if r.phases.is_empty() { "phase n/a".to_string() } else { r.phase_label() },
            r.age_range_label()
        );
        let site = export::site_label(r, country);
        if !site.is_empty() {
            println!("      Site: {site}");
        }
        for reason in t.reasons.iter().take(max_reasons) {
            println!("      • {reason}");
        }
        println!("      {}", r.url());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trialfinder=info,warn")),
        )
        .init();

    let args = Args::parse();
    let mut config = config::Config::load(args.config.as_deref())?;
    if let Some(pages) = args.pages {
        config.fetch.max_pages = pages;
    }
    if let Some(page_size) = args.page_size {
        config.fetch.page_size = page_size;
    }
    config.validate()?;

    let query = args.query();
    let patient = PatientFactors::from_query(&query, args.prior_bev);
    info!(diagnosis = %query.diagnosis, country = ?query.country(), "Searching ClinicalTrials.gov");

    let search = TrialSearch::new(
        TrialFetcher::clinicaltrials(config.fetch.clone())?,
        TrialCache::from_config(&config.cache),
        Scorer::new(&config.weights),
    );

    let outcome = match search.search(&patient, &query, args.refresh).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    let mut trials = outcome.trials.clone();
    if args.require_country {
        if let Some(country) = query.country() {
            trials.retain(|t| has_site_in(t, country));
        }
    }

    let diag = &outcome.diagnostics;
    println!("{}", summary_line(diag, trials.len()));
    for (cause, count) in &diag.reasons {
        println!("  skipped ({cause}): {count}");
    }

    if trials.is_empty() {
        let hint = outcome
            .relaxation_hint()
            .unwrap_or_else(|| "No trials have a site in the requested country.".to_string());
        println!("{hint}");
        return Ok(());
    }

    if let Some(path) = &args.csv {
        export::save_csv(path, &trials, query.country())?;
        info!(path = %path.display(), rows = trials.len(), "Wrote CSV");
    }
    if let Some(path) = &args.json {
        export::save_json(path, &trials)?;
        info!(path = %path.display(), rows = trials.len(), "Wrote JSON");
    }

    let top = args.top.unwrap_or(config.output.top);
    let shown = top_n(trials, top);
    if shown.is_empty() {
        warn!("--top 0 given; nothing to print");
    }
    print_trials(&shown, query.country(), config.output.max_reasons);

    Ok(())
}
