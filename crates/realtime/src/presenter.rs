//! Audio/Transcript Presenter
//!
//! Publishes observable session state to any number of subscribers: a
//! snapshot on a `watch` channel, the microphone level on its own `watch`
//! channel and discrete events on a `broadcast` channel.

use crate::{status::ConversationStatus, transcript::TranscriptEntry};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Option<Uuid>,
    pub persona_id: Option<String>,
    pub status: ConversationStatus,
    pub transcript: Vec<TranscriptEntry>,
    pub muted: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged(ConversationStatus),
    Transcript(TranscriptEntry),
    ToolCompleted {
        call_id: String,
        name: String,
        success: bool,
    },
    Error {
        message: String,
    },
}

pub struct SessionSubscription {
    pub snapshot: watch::Receiver<SessionSnapshot>,
    pub level: watch::Receiver<f32>,
    pub events: broadcast::Receiver<SessionEvent>,
}

pub struct Presenter {
    snapshot: watch::Sender<SessionSnapshot>,
    level: Arc<watch::Sender<f32>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        let (level, _) = watch::channel(0.0);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            snapshot,
            level: Arc::new(level),
            events,
        }
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            snapshot: self.snapshot.subscribe(),
            level: self.level.subscribe(),
            events: self.events.subscribe(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn level(&self) -> f32 {
        *self.level.borrow()
    }

    pub(crate) fn level_sender(&self) -> Arc<watch::Sender<f32>> {
        Arc::clone(&self.level)
    }

    /// Resets state for a new session.
    pub(crate) fn begin(&self, session_id: Uuid, persona_id: &str) {
        self.snapshot.send_replace(SessionSnapshot {
            session_id: Some(session_id),
            persona_id: Some(persona_id.to_string()),
            ..Default::default()
        });
        self.level.send_replace(0.0);
    }

    pub(crate) fn status(&self, status: ConversationStatus) {
        let changed = self.snapshot.send_if_modified(|snapshot| {
            if snapshot.status == status {
                return false;
            }
            snapshot.status = status;
            true
        });
        if changed {
            let _ = self.events.send(SessionEvent::StatusChanged(status));
        }
        if status.is_terminal() {
            self.level.send_replace(0.0);
        }
    }

    pub(crate) fn transcript(&self, entry: TranscriptEntry) {
        self.snapshot.send_modify(|snapshot| {
            match snapshot.transcript.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry.clone(),
                None => snapshot.transcript.push(entry.clone()),
            }
        });
        let _ = self.events.send(SessionEvent::Transcript(entry));
    }

    pub(crate) fn muted(&self, muted: bool) {
        self.snapshot.send_if_modified(|snapshot| {
            let changed = snapshot.muted != muted;
            snapshot.muted = muted;
            changed
        });
    }

    pub(crate) fn tool_completed(&self, call_id: &str, name: &str, success: bool) {
        let _ = self.events.send(SessionEvent::ToolCompleted {
            call_id: call_id.to_string(),
            name: name.to_string(),
            success,
        });
    }

    pub(crate) fn error(&self, message: String) {
        self.snapshot
            .send_modify(|snapshot| snapshot.error = Some(message.clone()));
        let _ = self.events.send(SessionEvent::Error { message });
    }
}
