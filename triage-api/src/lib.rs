//! Patient API access: resilient paging, submission, and the run pipeline.

use std::time::Duration;

mod fetch;
mod pipeline;
mod submit;
mod transport;

pub use fetch::{FetchError, Page, PatientFetcher};
pub use pipeline::{AssessmentPipeline, PipelineError, RunOutcome};
pub use submit::{ResultSubmitter, SubmitError};
pub use transport::{HttpTransport, Pacer, TokioPacer, Transport, TransportError};

pub const PATIENTS_PATH: &str = "/patients";
pub const SUBMIT_PATH: &str = "/submit-assessment";

/// Connection settings for the patient service.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    /// Per-request timeout applied by the HTTP client.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Paging, retry and throttling knobs for the fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    pub page_size: u32,
    /// Total attempts per page, first try included.
    pub max_attempts: u32,
    /// Backoff before retry `n` is `base_delay * n`.
    pub base_delay: Duration,
    /// Pause between successful page fetches.
    pub page_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            page_delay: Duration::from_millis(500),
        }
    }
}
