use std::sync::Arc;

use tracing::{info, warn};

use assess_core::model::{ActivityId, SubmissionResult};
use assess_core::Ledger;

use super::client::ScoringClient;
use super::payload::SubmissionPayload;
use crate::error::SessionError;

/// Owns the scoring round-trip for sessions.
///
/// Holds no session state: the ledger stays with the session controller and is
/// only read here, so a failed call leaves it untouched.
#[derive(Clone)]
pub struct SubmissionCoordinator {
    client: Arc<dyn ScoringClient>,
}

impl SubmissionCoordinator {
    #[must_use]
    pub fn new(client: Arc<dyn ScoringClient>) -> Self {
        Self { client }
    }

    /// Serialize the ledger for submission, refusing anything incomplete.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ValidationRejected` if the ledger cannot be submitted.
    pub fn prepare(ledger: &Ledger) -> Result<SubmissionPayload, SessionError> {
        SubmissionPayload::from_ledger(ledger).map_err(|rejection| {
            warn!(%rejection, "refusing to submit");
            SessionError::ValidationRejected(rejection)
        })
    }

    /// Perform exactly one scoring request.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unauthorized` for credential failures and
    /// `SessionError::SubmissionFailed` for every other failure, timeouts included.
    pub async fn submit(
        &self,
        activity: &ActivityId,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionResult, SessionError> {
        match self.client.submit_attempt(activity, payload).await {
            Ok(result) => {
                info!(
                    attempt = %result.attempt_id(),
                    passed = result.passed(),
                    "attempt scored"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(error = %err, "attempt submission failed");
                Err(err.into())
            }
        }
    }
}
