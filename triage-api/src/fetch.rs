use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};
use triage_core::PatientRecord;

use crate::{FetchPolicy, Pacer, Transport, TransportError, PATIENTS_PATH};

#[derive(thiserror::Error, Debug, Clone)]
pub enum FetchError {
    #[error("Page {page} still failing after {attempts} attempts: {source}")]
    Exhausted {
        page: u32,
        attempts: u32,
        source: TransportError,
    },
    #[error("Page {page} failed: {source}")]
    Fatal { page: u32, source: TransportError },
}

/// One page of raw records and whether upstream has more.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<PatientRecord>,
    pub has_next: bool,
}

impl Page {
    /// Read `{ data: [...], pagination: { hasNext } }`.
    ///
    /// A body without a `data` array ends the stream.
    pub fn from_value(body: &Value) -> Self {
        let Some(data) = body.get("data").and_then(Value::as_array) else {
            return Self::default();
        };

        let has_next = body
            .get("pagination")
            .and_then(|pagination| pagination.get("hasNext"))
            .is_some_and(is_truthy);

        Self {
            records: data.iter().map(PatientRecord::from_value).collect(),
            has_next,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Sequential page reader with per-page retry and inter-page throttling.
pub struct PatientFetcher {
    transport: Arc<dyn Transport>,
    pacer: Arc<dyn Pacer>,
    policy: FetchPolicy,
}

impl PatientFetcher {
    pub fn new(transport: Arc<dyn Transport>, pacer: Arc<dyn Pacer>, policy: FetchPolicy) -> Self {
        Self {
            transport,
            pacer,
            policy,
        }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetch one page, retrying transient statuses with linear backoff.
    pub async fn fetch_page(&self, page: u32) -> Result<Page, FetchError> {
        let query = [
            ("page", page.to_string()),
            ("limit", self.policy.page_size.to_string()),
        ];
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.transport.get_json(PATIENTS_PATH, &query).await {
                Ok(body) => return Ok(Page::from_value(&body)),
                Err(source) if source.is_retryable() && attempt < max_attempts => {
                    let backoff = self.policy.base_delay * attempt;
                    warn!(
                        page,
                        status = ?status_of(&source),
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "Retryable error fetching patients, backing off"
                    );
                    self.pacer.pause(backoff).await;
                    attempt += 1;
                }
                Err(source) if source.is_retryable() => {
                    return Err(FetchError::Exhausted {
                        page,
                        attempts: attempt,
                        source,
                    })
                }
                Err(source) => return Err(FetchError::Fatal { page, source }),
            }
        }
    }

    /// Fetch every page in order, starting at page 1.
    pub async fn fetch_pages(&self) -> Result<Vec<Page>, FetchError> {
        let mut pages = Vec::new();
        let mut page_number = 1;

        loop {
            let page = self.fetch_page(page_number).await?;
            info!(
                page = page_number,
                records = page.records.len(),
                has_next = page.has_next,
                "Fetched patient page"
            );

            let has_next = page.has_next;
            pages.push(page);
            if !has_next {
                return Ok(pages);
            }

            self.pacer.pause(self.policy.page_delay).await;
            page_number += 1;
        }
    }

    /// All records across all pages, page order then within-page order.
    pub async fn fetch_all(&self) -> Result<Vec<PatientRecord>, FetchError> {
        let pages = self.fetch_pages().await?;
        Ok(pages.into_iter().flat_map(|page| page.records).collect())
    }
}

fn status_of(err: &TransportError) -> Option<u16> {
    match err {
        TransportError::Status { status, .. } => Some(*status),
        _ => None,
    }
}
