use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use assess_core::model::{ActivityId, SubmissionResult};

use super::payload::SubmissionPayload;
use crate::config::ServiceConfig;
use crate::error::ScoringError;
use crate::http::{authorize, build_client, error_message, is_unauthorized};

/// The remote scoring authority.
#[async_trait]
pub trait ScoringClient: Send + Sync {
    /// Submit one attempt and return the scorer's verdict.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::Unauthorized` for rejected credentials and other
    /// `ScoringError` variants for transport, status or decoding failures.
    async fn submit_attempt(
        &self,
        activity: &ActivityId,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionResult, ScoringError>;
}

/// Scoring client backed by the remote scoring endpoint.
#[derive(Clone)]
pub struct HttpScoringClient {
    client: Client,
    config: ServiceConfig,
}

impl HttpScoringClient {
    /// # Errors
    ///
    /// Returns `ScoringError::Http` if the HTTP client cannot be built.
    pub fn new(config: ServiceConfig) -> Result<Self, ScoringError> {
        Ok(Self::with_client(build_client(&config)?, config))
    }

    #[must_use]
    pub fn with_client(client: Client, config: ServiceConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ScoringClient for HttpScoringClient {
    async fn submit_attempt(
        &self,
        activity: &ActivityId,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionResult, ScoringError> {
        let url = self
            .config
            .endpoint(&["activities", activity.as_str(), "attempts"]);
        debug!(%url, "submitting attempt");

        let response = authorize(self.client.post(url), &self.config)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if is_unauthorized(status) {
            return Err(ScoringError::Unauthorized);
        }
        if !status.is_success() {
            let message = error_message(response).await;
            warn!(status = status.as_u16(), ?message, "scoring service refused attempt");
            return Err(ScoringError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ScoringError::Malformed(e.to_string()))
    }
}
