//! Error taxonomy of a voice session.
//!
//! Everything except `ToolExecutionError` is fatal for the session: it moves
//! the status to `Error` (or `Disconnected` for a closed transport) and
//! triggers a full teardown. Tool failures stay inside the dispatcher.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to get session token: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Failed to get session token: backend returned {status}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Microphone access was denied")]
    Denied,
    #[error("Microphone unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("SDP exchange failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("SDP exchange failed: {status}")]
    Rejected { status: u16, body: String },
    #[error("Timed out after {after:?} waiting for {stage}")]
    Timeout { stage: &'static str, after: Duration },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Peer connection failed: {0}")]
    Peer(String),
    #[error("Data channel is closed")]
    ChannelClosed,
    #[error("Failed to encode client event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A failed tool invocation. Reported to the model as an `{error}` payload.
#[derive(Debug, Error)]
pub enum ToolExecutionError {
    #[error("Tool request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Tool endpoint returned {0}")]
    Rejected(u16),
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    MediaAccess(#[from] MediaError),
    #[error(transparent)]
    Signaling(#[from] SignalingError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Connection closed unexpectedly")]
    TransportClosed,
    #[error("Call ended")]
    Cancelled,
    #[error("No active call")]
    NoActiveSession,
}

impl SessionError {
    /// Unexpected disconnects end in `Disconnected` rather than `Error`.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            SessionError::TransportClosed | SessionError::Transport(TransportError::ChannelClosed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            SessionError::from(MediaError::Denied).to_string(),
            "Microphone access was denied"
        );
        assert_eq!(
            SessionError::Provider("Invalid session".to_string()).to_string(),
            "Provider error: Invalid session"
        );
        let timeout = SignalingError::Timeout {
            stage: "SDP answer",
            after: Duration::from_secs(15),
        };
        assert_eq!(timeout.to_string(), "Timed out after 15s waiting for SDP answer");
    }

    #[test]
    fn test_disconnect_classification() {
        assert!(SessionError::TransportClosed.is_disconnect());
        assert!(SessionError::from(TransportError::ChannelClosed).is_disconnect());
        assert!(!SessionError::Provider("boom".to_string()).is_disconnect());
    }
}
