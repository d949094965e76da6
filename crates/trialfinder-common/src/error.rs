use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrialFinderError {
    /// Connectivity failure or timeout talking to the registry.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-retryable HTTP status from the registry, surfaced verbatim.
    #[error("Registry error (HTTP {status}): {message}")]
    Registry { status: u16, message: String },

    #[error("Malformed registry response: {0}")]
    MalformedResponse(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrialFinderError {
    /// Whether retrying the same request may succeed.
    /// Timeouts, connect failures, 5xx and 429 qualify; other 4xx do not.
    pub fn is_transient(&self) -> bool {
        match self {
            TrialFinderError::Network(_) => true,
            TrialFinderError::Registry { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Banner-level text for whoever renders a failed search.
    pub fn user_message(&self) -> String {
        match self {
            TrialFinderError::Network(detail) => format!(
                "Trial data unavailable: could not reach ClinicalTrials.gov ({detail}). \
                 Check your connection and try again."
            ),
            TrialFinderError::Registry { status, message } => {
                format!("ClinicalTrials.gov returned HTTP {status}: {message}")
            }
            TrialFinderError::MalformedResponse(_) => {
                "ClinicalTrials.gov returned an unexpected response. Try again later.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for TrialFinderError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TrialFinderError::Registry {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None if err.is_decode() => TrialFinderError::MalformedResponse(err.to_string()),
            None => TrialFinderError::Network(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrialFinderError>;
