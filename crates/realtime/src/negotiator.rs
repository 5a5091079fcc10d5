//! Session Negotiator
//!
//! Acquires everything a session needs, in order: a fresh credential, the
//! microphone, the peer connection with its event data channel, and the SDP
//! answer. Acquired resources go straight into the caller's
//! [`SessionTransport`], so a failed or cancelled negotiation leaves nothing
//! behind that the caller's `release` does not reach.

use crate::{
    config::RealtimeConfig,
    credentials::{BusinessSummary, CredentialSource},
    error::{SessionError, SignalingError},
    signaling::Signaling,
    transport::{AudioConstraints, MediaDevices, PeerFactory, SessionTransport},
};
use receptionist_core::SessionConfig;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct NegotiationSettings {
    pub data_channel_label: String,
    pub timeout: Duration,
    pub constraints: AudioConstraints,
}

impl From<&RealtimeConfig> for NegotiationSettings {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            data_channel_label: config.data_channel_label.clone(),
            timeout: config.negotiation_timeout,
            constraints: AudioConstraints::default(),
        }
    }
}

/// What a successful negotiation hands to the session.
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub session_config: SessionConfig,
    pub business: Option<BusinessSummary>,
}

pub struct Negotiator {
    credentials: Arc<dyn CredentialSource>,
    media: Arc<dyn MediaDevices>,
    peers: Arc<dyn PeerFactory>,
    signaling: Arc<dyn Signaling>,
    settings: NegotiationSettings,
}

impl Negotiator {
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        media: Arc<dyn MediaDevices>,
        peers: Arc<dyn PeerFactory>,
        signaling: Arc<dyn Signaling>,
        settings: NegotiationSettings,
    ) -> Self {
        Self {
            credentials,
            media,
            peers,
            signaling,
            settings,
        }
    }

    pub fn settings(&self) -> &NegotiationSettings {
        &self.settings
    }

    /// Runs steps one to four of session setup. Sending the session
    /// configuration and waiting for the acknowledgment happen once the data
    /// channel opens, inside the session loop.
    #[instrument(skip_all, fields(persona = %persona))]
    pub async fn negotiate(
        &self,
        persona: &str,
        transport: &mut SessionTransport,
    ) -> Result<Negotiated, SessionError> {
        let grant = self.credentials.request(persona).await?;
        debug!(expires_at = ?grant.expires_at, "Credential obtained");

        let microphone = self
            .media
            .open_microphone(&self.settings.constraints)
            .await?;
        let microphone = transport.microphone.insert(microphone);
        debug!("Microphone acquired");

        let peer = self.peers.create(microphone.as_mut()).await?;
        let peer = transport.peer.insert(peer);
        let channel = peer
            .create_data_channel(&self.settings.data_channel_label)
            .await?;
        let offer = peer.create_offer().await?;

        let answer = tokio::time::timeout(
            self.settings.timeout,
            self.signaling.exchange(&grant.client_secret, offer),
        )
        .await
        .map_err(|_| SignalingError::Timeout {
            stage: "SDP answer",
            after: self.settings.timeout,
        })??;
        drop(grant.client_secret);

        peer.apply_answer(answer).await?;
        transport.attach_channel(channel);
        info!("Peer connection negotiated");

        Ok(Negotiated {
            session_config: grant.session_config,
            business: grant.business,
        })
    }
}

