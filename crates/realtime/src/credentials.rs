//! Short-lived session credentials.
//!
//! Each session asks the backend for a fresh ephemeral secret together with
//! the session configuration. The secret is kept in a `SecretString`, used
//! for exactly one SDP exchange and then dropped.

use crate::error::CredentialError;
use async_trait::async_trait;
use receptionist_core::SessionConfig;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

/// Public details of the business the session speaks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSummary {
    pub id: String,
    pub name: String,
    pub agent_name: String,
    pub greeting: String,
}

/// What the credential endpoint hands out for one session.
#[derive(Debug)]
pub struct SessionGrant {
    pub client_secret: SecretString,
    /// Unix timestamp after which the secret is no longer accepted.
    pub expires_at: Option<i64>,
    pub session_config: SessionConfig,
    pub business: Option<BusinessSummary>,
}

#[derive(Deserialize)]
struct WireSecret {
    value: String,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Deserialize)]
struct WireGrant {
    client_secret: WireSecret,
    session_config: SessionConfig,
    #[serde(default)]
    business: Option<BusinessSummary>,
}

impl From<WireGrant> for SessionGrant {
    fn from(wire: WireGrant) -> Self {
        Self {
            client_secret: SecretString::from(wire.client_secret.value),
            expires_at: wire.client_secret.expires_at,
            session_config: wire.session_config,
            business: wire.business,
        }
    }
}

#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn request(&self, persona: &str) -> Result<SessionGrant, CredentialError>;
}

/// Requests credentials from the receptionist backend over HTTP.
pub struct HttpCredentialSource {
    client: reqwest::Client,
    backend_url: String,
}

impl HttpCredentialSource {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), backend_url)
    }

    pub fn with_client(client: reqwest::Client, backend_url: impl Into<String>) -> Self {
        Self {
            client,
            backend_url: backend_url.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for HttpCredentialSource {
    #[instrument(skip(self))]
    async fn request(&self, persona: &str) -> Result<SessionGrant, CredentialError> {
        let url = format!("{}/realtime/session", self.backend_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&json!({ "persona": persona }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let grant: WireGrant = response.json().await?;
        debug!("Session credential issued");
        Ok(grant.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_grant_from_backend_payload() {
        let business = receptionist_core::BusinessCatalog::demo().get("barber").unwrap();
        let config = SessionConfig::for_business(&business, "shimmer");
        let payload = json!({
            "client_secret": {"value": "ek_test_123", "expires_at": 1718000000},
            "session_config": config,
            "business": {
                "id": "demo-barber",
                "name": "Raj's Premium Salon",
                "agentName": "Priya",
                "greeting": "Namaste!"
            }
        });

        let grant: SessionGrant = serde_json::from_value::<WireGrant>(payload).unwrap().into();
        assert_eq!(grant.client_secret.expose_secret(), "ek_test_123");
        assert_eq!(grant.expires_at, Some(1_718_000_000));
        assert_eq!(grant.session_config.voice, "shimmer");
        assert_eq!(grant.business.unwrap().agent_name, "Priya");
    }

    #[test]
    fn test_debug_output_redacts_secret() {
        let grant = SessionGrant {
            client_secret: SecretString::from("ek_super_secret".to_string()),
            expires_at: None,
            session_config: SessionConfig::for_business(
                &receptionist_core::BusinessCatalog::demo().get("gym").unwrap(),
                "ash",
            ),
            business: None,
        };
        assert!(!format!("{grant:?}").contains("ek_super_secret"));
    }
}
