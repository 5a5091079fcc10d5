//! Realtime voice sessions for the AI receptionist.
//!
//! A [`VoiceAgent`] negotiates a WebRTC session with the realtime provider,
//! interprets the provider's event stream into a conversation status and
//! transcript, and runs the receptionist tools the model asks for. Platform
//! media (microphone capture, peer connection) is supplied by the host
//! through the traits in [`transport`].

pub mod agent;
pub mod config;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod interpreter;
pub mod level;
pub mod listening;
pub mod negotiator;
pub mod presenter;
pub mod protocol;
pub mod session;
pub mod signaling;
pub mod status;
pub mod transcript;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::VoiceAgent;
pub use config::RealtimeConfig;
pub use error::SessionError;
pub use presenter::{SessionEvent, SessionSnapshot, SessionSubscription};
pub use session::SessionInfo;
pub use status::ConversationStatus;
