//! SDP offer/answer exchange with the realtime provider.

use crate::error::SignalingError;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

#[async_trait]
pub trait Signaling: Send + Sync {
    /// Sends the local offer and returns the provider's SDP answer.
    async fn exchange(
        &self,
        credential: &SecretString,
        offer_sdp: String,
    ) -> Result<String, SignalingError>;
}

pub struct HttpSignaling {
    client: reqwest::Client,
    provider_url: String,
    model: String,
}

impl HttpSignaling {
    pub fn new(provider_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider_url: provider_url.into(),
            model: model.into(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/realtime?model={}",
            self.provider_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl Signaling for HttpSignaling {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn exchange(
        &self,
        credential: &SecretString,
        offer_sdp: String,
    ) -> Result<String, SignalingError> {
        let response = self
            .client
            .post(self.endpoint())
            .header(
                AUTHORIZATION,
                format!("Bearer {}", credential.expose_secret()),
            )
            .header(CONTENT_TYPE, "application/sdp")
            .body(offer_sdp)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SignalingError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let answer = response.text().await?;
        debug!(bytes = answer.len(), "Received SDP answer");
        Ok(answer)
    }
}
