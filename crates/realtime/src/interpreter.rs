//! Event Stream Interpreter
//!
//! Classifies provider events and folds them into the conversation status
//! and transcript. It performs no I/O: everything the session has to act on
//! comes back as an [`Effect`].

use crate::{
    dispatcher::ToolInvocation,
    error::SessionError,
    protocol::ServerEvent,
    status::{ConversationStatus, StatusInput, transition},
    transcript::{Speaker, Transcript, TranscriptEntry},
};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum Effect {
    StatusChanged(ConversationStatus),
    TranscriptUpdated(TranscriptEntry),
    Dispatch(ToolInvocation),
    Fatal(SessionError),
}

#[derive(Debug, Default)]
pub struct Interpreter {
    status: ConversationStatus,
    transcript: Transcript,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ConversationStatus {
        self.status
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Applies a status input. Returns the new status if it changed.
    pub fn apply(&mut self, input: StatusInput) -> Option<ConversationStatus> {
        let next = transition(self.status, input);
        if next == self.status {
            return None;
        }
        debug!(from = %self.status, to = %next, ?input, "Status transition");
        self.status = next;
        Some(next)
    }

    /// Parses and handles one raw data channel message.
    pub fn handle_raw(&mut self, raw: &str) -> Vec<Effect> {
        match ServerEvent::parse(raw) {
            Ok(event) => self.handle(event),
            Err(e) => {
                warn!(error = %e, "Skipping unparseable provider message");
                Vec::new()
            }
        }
    }

    pub fn handle(&mut self, event: ServerEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            ServerEvent::SessionCreated => self.push_status(StatusInput::SessionAcknowledged, &mut effects),
            ServerEvent::SessionUpdated => {
                self.push_status(StatusInput::ConfigurationAcknowledged, &mut effects)
            }
            ServerEvent::SpeechStarted => self.push_status(StatusInput::SpeechStarted, &mut effects),
            ServerEvent::SpeechStopped => self.push_status(StatusInput::SpeechStopped, &mut effects),
            ServerEvent::AgentAudioStarted => {
                self.push_status(StatusInput::AgentAudioStarted, &mut effects)
            }
            ServerEvent::AgentTranscriptDelta { item_id, delta } => push_entry(
                self.transcript
                    .append_delta(Speaker::Agent, item_id.as_deref(), &delta),
                &mut effects,
            ),
            ServerEvent::AgentTranscriptDone {
                item_id,
                transcript,
            } => push_entry(
                self.transcript
                    .finalize(Speaker::Agent, item_id.as_deref(), &transcript),
                &mut effects,
            ),
            ServerEvent::UserTranscriptDelta { item_id, delta } => push_entry(
                self.transcript
                    .append_delta(Speaker::User, item_id.as_deref(), &delta),
                &mut effects,
            ),
            ServerEvent::UserTranscriptCompleted {
                item_id,
                transcript,
            } => push_entry(
                self.transcript
                    .finalize(Speaker::User, item_id.as_deref(), &transcript),
                &mut effects,
            ),
            ServerEvent::ResponseDone => {
                effects.extend(
                    self.transcript
                        .finalize_pending(Speaker::Agent)
                        .into_iter()
                        .map(Effect::TranscriptUpdated),
                );
                self.push_status(StatusInput::ResponseDone, &mut effects);
            }
            ServerEvent::FunctionCallArgumentsDone {
                call_id,
                name,
                arguments,
            } => effects.push(Effect::Dispatch(ToolInvocation {
                call_id,
                name,
                arguments_json: arguments,
            })),
            ServerEvent::Error { error } => {
                let message = error
                    .message
                    .or(error.code)
                    .unwrap_or_else(|| "Unknown provider error".to_string());
                effects.push(Effect::Fatal(SessionError::Provider(message)));
            }
            ServerEvent::AgentAudioStopped | ServerEvent::Unknown => {}
        }
        effects
    }

    /// Records text the user typed instead of speaking. Speech still being
    /// transcribed keeps its own entry.
    pub fn record_user_text(&mut self, text: &str) -> Option<TranscriptEntry> {
        self.transcript.push_final(Speaker::User, text).cloned()
    }

    fn push_status(&mut self, input: StatusInput, effects: &mut Vec<Effect>) {
        if let Some(status) = self.apply(input) {
            effects.push(Effect::StatusChanged(status));
        }
    }
}

fn push_entry(entry: Option<&TranscriptEntry>, effects: &mut Vec<Effect>) {
    if let Some(entry) = entry {
        effects.push(Effect::TranscriptUpdated(entry.clone()));
    }
}
