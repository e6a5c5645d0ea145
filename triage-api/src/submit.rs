use std::sync::Arc;

use serde_json::Value;
use tracing::info;
use triage_core::AssessmentSet;

use crate::{Transport, TransportError, SUBMIT_PATH};

#[derive(thiserror::Error, Debug, Clone)]
pub enum SubmitError {
    /// Upstream answered with an error payload.
    #[error("Submission rejected with status {status}: {payload}")]
    Rejected { status: u16, payload: Value },
    #[error("Submission failed: {0}")]
    Transport(String),
}

impl From<TransportError> for SubmitError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status {
                status,
                body: Some(payload),
            } => Self::Rejected { status, payload },
            other => Self::Transport(other.to_string()),
        }
    }
}

pub struct ResultSubmitter {
    transport: Arc<dyn Transport>,
}

impl ResultSubmitter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send the three output sets in one request and return the acknowledgement.
    pub async fn submit(&self, assessment: &AssessmentSet) -> Result<Value, SubmitError> {
        let body = serde_json::to_value(assessment)
            .map_err(|err| SubmitError::Transport(err.to_string()))?;

        info!(
            high_risk = assessment.high_risk_patients.len(),
            fever = assessment.fever_patients.len(),
            data_quality = assessment.data_quality_issues.len(),
            "Submitting assessment"
        );

        Ok(self.transport.post_json(SUBMIT_PATH, &body).await?)
    }
}
