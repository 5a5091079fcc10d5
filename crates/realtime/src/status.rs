//! Conversation status state machine.
//!
//! `Idle → Connecting → Connected → Listening ⇄ Processing ⇄ Speaking`, with
//! `Error` and `Disconnected` reachable from any live state and terminal for
//! the session instance.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Listening,
    Processing,
    Speaking,
    Error,
    Disconnected,
}

impl ConversationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConversationStatus::Error | ConversationStatus::Disconnected)
    }

    /// The provider has acknowledged the session and it has not ended.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            ConversationStatus::Connected
                | ConversationStatus::Listening
                | ConversationStatus::Processing
                | ConversationStatus::Speaking
        )
    }

    /// A model response is being produced or played.
    pub fn response_in_progress(self) -> bool {
        matches!(
            self,
            ConversationStatus::Processing | ConversationStatus::Speaking
        )
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversationStatus::Idle => "idle",
            ConversationStatus::Connecting => "connecting",
            ConversationStatus::Connected => "connected",
            ConversationStatus::Listening => "listening",
            ConversationStatus::Processing => "processing",
            ConversationStatus::Speaking => "speaking",
            ConversationStatus::Error => "error",
            ConversationStatus::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Inputs that can move the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusInput {
    StartRequested,
    SessionAcknowledged,
    ConfigurationAcknowledged,
    SpeechStarted,
    SpeechStopped,
    AgentAudioStarted,
    ResponseDone,
    Failed,
    TransportClosed,
    EndRequested,
}

impl StatusInput {
    pub const ALL: [StatusInput; 10] = [
        StatusInput::StartRequested,
        StatusInput::SessionAcknowledged,
        StatusInput::ConfigurationAcknowledged,
        StatusInput::SpeechStarted,
        StatusInput::SpeechStopped,
        StatusInput::AgentAudioStarted,
        StatusInput::ResponseDone,
        StatusInput::Failed,
        StatusInput::TransportClosed,
        StatusInput::EndRequested,
    ];
}

/// Pure transition function. Inputs that do not apply leave the status as is.
pub fn transition(current: ConversationStatus, input: StatusInput) -> ConversationStatus {
    use ConversationStatus::*;

    if current.is_terminal() {
        return current;
    }

    match (current, input) {
        (Idle, StatusInput::StartRequested) => Connecting,
        (Connecting, StatusInput::SessionAcknowledged) => Connected,
        (Connected, StatusInput::ConfigurationAcknowledged) => Listening,
        (Connected | Listening | Processing | Speaking, StatusInput::SpeechStarted) => Listening,
        (Listening, StatusInput::SpeechStopped) => Processing,
        (Connected | Listening | Processing | Speaking, StatusInput::AgentAudioStarted) => Speaking,
        (Processing | Speaking, StatusInput::ResponseDone) => Listening,
        (_, StatusInput::Failed) => Error,
        (Idle, StatusInput::TransportClosed | StatusInput::EndRequested) => Idle,
        (_, StatusInput::TransportClosed | StatusInput::EndRequested) => Disconnected,
        (state, _) => state,
    }
}
