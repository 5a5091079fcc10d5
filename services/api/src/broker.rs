//! Ephemeral Realtime Credentials
//!
//! The browser never sees the long-lived provider key. For every call the
//! backend asks the provider for a short-lived client secret bound to the
//! model and voice, and hands only that secret out.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Realtime session request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Realtime provider returned {status}")]
    Rejected { status: u16, body: String },
}

/// A short-lived client secret for one realtime session.
#[derive(Debug)]
pub struct EphemeralSecret {
    pub value: SecretString,
    pub expires_at: Option<i64>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionBroker: Send + Sync {
    async fn create_session(&self, voice: &str) -> Result<EphemeralSecret, BrokerError>;
}

pub struct OpenAIBroker {
    client: reqwest::Client,
    api_key: SecretString,
    api_base: String,
    model: String,
}

impl OpenAIBroker {
    pub fn new(api_key: SecretString, api_base: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_base: api_base.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/realtime/sessions", self.api_base.trim_end_matches('/'))
    }
}

#[derive(Deserialize)]
struct SessionsResponse {
    client_secret: WireSecret,
}

#[derive(Deserialize)]
struct WireSecret {
    value: String,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[async_trait]
impl SessionBroker for OpenAIBroker {
    #[instrument(skip(self), fields(model = %self.model))]
    async fn create_session(&self, voice: &str) -> Result<EphemeralSecret, BrokerError> {
        let response = self
            .client
            .post(self.endpoint())
            .header(
                AUTHORIZATION,
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&json!({ "model": self.model, "voice": voice }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrokerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let session: SessionsResponse = response.json().await?;
        debug!(expires_at = ?session.client_secret.expires_at, "Ephemeral secret issued");
        Ok(EphemeralSecret {
            value: SecretString::from(session.client_secret.value),
            expires_at: session.client_secret.expires_at,
        })
    }
}
