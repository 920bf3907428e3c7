use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use assess_core::model::{ActivityDefinition, ActivityId};

use super::normalize::decode_activity;
use super::payload::ContentFormat;
use crate::config::ServiceConfig;
use crate::error::ContentError;
use crate::http::{authorize, build_client, error_message, is_unauthorized};

/// Where activity definitions come from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch and normalize one activity.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Unauthorized` for rejected credentials and other
    /// `ContentError` variants for transport, status or payload failures.
    async fn fetch_activity(
        &self,
        id: &ActivityId,
        hint: Option<ContentFormat>,
    ) -> Result<ActivityDefinition, ContentError>;
}

/// Content source backed by the remote content service.
#[derive(Clone)]
pub struct HttpContentSource {
    client: Client,
    config: ServiceConfig,
}

impl HttpContentSource {
    /// # Errors
    ///
    /// Returns `ContentError::Http` if the HTTP client cannot be built.
    pub fn new(config: ServiceConfig) -> Result<Self, ContentError> {
        Ok(Self::with_client(build_client(&config)?, config))
    }

    #[must_use]
    pub fn with_client(client: Client, config: ServiceConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch_activity(
        &self,
        id: &ActivityId,
        hint: Option<ContentFormat>,
    ) -> Result<ActivityDefinition, ContentError> {
        let mut url = self.config.endpoint(&["activities", id.as_str()]);
        if let Some(hint) = hint {
            url.query_pairs_mut().append_pair("version", hint.as_str());
        }
        debug!(%url, "fetching activity");

        let response = authorize(self.client.get(url), &self.config)
            .send()
            .await?;

        let status = response.status();
        if is_unauthorized(status) {
            return Err(ContentError::Unauthorized);
        }
        if !status.is_success() {
            let message = error_message(response).await;
            warn!(status = status.as_u16(), ?message, "content service refused activity");
            return Err(ContentError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let definition = decode_activity(&body, hint)?;
        if definition.id() != id {
            warn!(requested = %id, served = %definition.id(), "content service sent another activity");
            return Err(ContentError::Malformed(format!(
                "requested activity {id} but received {}",
                definition.id()
            )));
        }
        Ok(definition)
    }
}
