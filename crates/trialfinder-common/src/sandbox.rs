use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::TrialFinderError;

/// Default per-request timeout for registry calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent sent with every registry request.
pub const USER_AGENT: &str = concat!(
    "trialfinder/",
    env!("CARGO_PKG_VERSION"),
    " (+https://clinicaltrials.gov)"
);

/// An HTTP client that only allows requests to approved domains.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a new SandboxClient with the default registry allowlist and timeout.
    pub fn new() -> Result<Self, TrialFinderError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Same as [`SandboxClient::new`] with a caller-chosen per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TrialFinderError> {
        let mut allowlist = HashSet::new();
        let domains = [
            "clinicaltrials.gov", // ClinicalTrials.gov v2 API
            "localhost",          // local registry mirrors
            "127.0.0.1",
        ];

        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TrialFinderError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or a subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Exposes the inner `reqwest::Client` builder for GET requests.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, TrialFinderError> {
        if !self.is_allowed(url) {
            return Err(TrialFinderError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }
}
