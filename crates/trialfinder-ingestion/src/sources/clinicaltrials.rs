//! ClinicalTrials.gov v2 API client.
//!
//! API docs: https://clinicaltrials.gov/data-api/api
//! Endpoint: https://clinicaltrials.gov/api/v2/studies
//!
//! Query parameters sent:
//!   - query.cond           = diagnosis synonyms, OR-joined
//!   - query.locn           = patient country, aliases resolved (when given)
//!   - filter.overallStatus = comma-joined status filter
//!   - pageSize / pageToken / format=json

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};
use trialfinder_common::diagnosis::registry_country;
use trialfinder_common::sandbox::SandboxClient as Client;
use trialfinder_common::{Result, TrialFinderError};

use super::RegistrySource;
use crate::models::{QueryParams, RawTrialPage};

pub const CT_API_URL: &str = "https://clinicaltrials.gov/api/v2/studies";

/// Longest slice of an error body carried into `Registry` errors.
const MAX_ERROR_BODY: usize = 500;

pub struct ClinicalTrialsClient {
    client: Client,
    base_url: String,
}

impl ClinicalTrialsClient {
    pub fn new() -> Result<Self> {
        Ok(Self { client: Client::new()?, base_url: CT_API_URL.to_string() })
    }

    /// Client against a custom endpoint (e.g. a local mirror) with its own timeout.
    /// The endpoint host is added to the sandbox allowlist.
    pub fn with_endpoint(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut client = Client::with_timeout(timeout)?;
        let host = url::Url::parse(base_url)
            .map_err(|e| TrialFinderError::Config(format!("invalid registry URL {base_url}: {e}")))?
            .host_str()
            .map(String::from)
            .ok_or_else(|| TrialFinderError::Config(format!("registry URL {base_url} has no host")))?;
        client.allow_domain(&host);
        Ok(Self { client, base_url: base_url.to_string() })
    }
}

/// `query.cond` expression: synonyms OR-joined, multi-word ones quoted.
pub fn condition_expression(query: &QueryParams) -> String {
    query
        .diagnosis
        .search_terms()
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| if t.contains(' ') { format!("\"{t}\"") } else { t.to_string() })
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Full query string for one page request.
pub fn build_query(
    query: &QueryParams,
    page_token: Option<&str>,
    page_size: usize,
) -> Vec<(&'static str, String)> {
    let status_filter = query
        .effective_statuses()
        .iter()
        .map(|s| s.as_api_str().to_string())
        .collect::<Vec<_>>()
        .join(",");

    let mut params = vec![
        ("query.cond", condition_expression(query)),
        ("filter.overallStatus", status_filter),
        ("pageSize", page_size.to_string()),
        ("format", "json".to_string()),
    ];
    if let Some(country) = query.country() {
        params.push(("query.locn", registry_country(country)));
    }
    if let Some(token) = page_token {
        params.push(("pageToken", token.to_string()));
    }
    params
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

#[async_trait]
impl RegistrySource for ClinicalTrialsClient {
    #[instrument(skip(self, query), fields(diagnosis = %query.diagnosis))]
    async fn fetch_page(
        &self,
        query: &QueryParams,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<RawTrialPage> {
        let resp = self.client
            .get(&self.base_url)?
            .query(&build_query(query, page_token, page_size))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(TrialFinderError::Registry {
                status: status.as_u16(),
                message: truncate(&body),
            });
        }

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            TrialFinderError::MalformedResponse(format!("page body is not JSON: {e}"))
        })?;
        debug!(bytes = body.len(), "ClinicalTrials.gov page retrieved");
        Ok(RawTrialPage(value))
    }

    fn name(&self) -> &'static str {
        "clinicaltrials.gov"
    }
}
