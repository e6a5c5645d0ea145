use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};
use triage_core::{aggregate, quality_issues, AssessmentReport, RiskConfig};

use crate::{
    ClientConfig, FetchError, FetchPolicy, HttpTransport, Pacer, PatientFetcher, ResultSubmitter,
    SubmitError, TokioPacer, Transport, TransportError,
};

#[derive(thiserror::Error, Debug, Clone)]
pub enum PipelineError {
    #[error("Fetching patients failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Submitting assessment failed: {0}")]
    Submit(#[from] SubmitError),
}

/// Result of a full run: what was sent and what upstream answered.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub report: AssessmentReport,
    pub acknowledgement: Value,
}

/// Fetch, then aggregate, then submit. Any failure aborts the run.
pub struct AssessmentPipeline {
    fetcher: PatientFetcher,
    submitter: ResultSubmitter,
    config: RiskConfig,
}

impl AssessmentPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        pacer: Arc<dyn Pacer>,
        policy: FetchPolicy,
        config: RiskConfig,
    ) -> Self {
        Self {
            fetcher: PatientFetcher::new(transport.clone(), pacer, policy),
            submitter: ResultSubmitter::new(transport),
            config,
        }
    }

    /// Pipeline over HTTP with tokio timers.
    pub fn connect(
        client: &ClientConfig,
        policy: FetchPolicy,
        config: RiskConfig,
    ) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(client)?;
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(TokioPacer),
            policy,
            config,
        ))
    }

    /// Fetch every page and classify the records without submitting.
    pub async fn assess(&self) -> Result<AssessmentReport, PipelineError> {
        let pages = self.fetcher.fetch_pages().await?;
        let records: Vec<_> = pages.iter().flat_map(|page| &page.records).collect();

        for record in &records {
            let issues = quality_issues(record);
            if !issues.is_empty() {
                debug!(patient_id = %record.patient_id, ?issues, "Data quality issue");
            }
        }

        let assessment = aggregate(records.iter().copied(), &self.config);
        let report = AssessmentReport::new(records.len(), assessment);
        info!(
            pages = pages.len(),
            records = report.records_total,
            scored = report.records_scored,
            "Assessment complete"
        );
        Ok(report)
    }

    pub async fn run(&self) -> Result<RunOutcome, PipelineError> {
        let report = self.assess().await?;
        let acknowledgement = self.submitter.submit(&report.assessment).await?;
        Ok(RunOutcome {
            report,
            acknowledgement,
        })
    }
}
