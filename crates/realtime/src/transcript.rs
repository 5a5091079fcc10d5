//! Conversation transcript.
//!
//! Entries are appended in emission order. A speaker has at most one
//! in-progress entry per provider item, which is replaced in place as deltas
//! arrive and becomes immutable once finalized. Deltas without an item id
//! share a single in-progress entry per speaker.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub id: u64,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_final: bool,
}

/// An in-progress entry and the provider item it belongs to.
#[derive(Debug)]
struct Pending {
    speaker: Speaker,
    item_id: Option<String>,
    index: usize,
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    pending: Vec<Pending>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// The speaker's most recent in-progress entry.
    pub fn in_progress(&self, speaker: Speaker) -> Option<&TranscriptEntry> {
        self.pending
            .iter()
            .rev()
            .find(|p| p.speaker == speaker)
            .map(|p| &self.entries[p.index])
    }

    fn pending_for_delta(&self, speaker: Speaker, item_id: Option<&str>) -> Option<usize> {
        self.pending
            .iter()
            .position(|p| p.speaker == speaker && p.item_id.as_deref() == item_id)
    }

    /// A finalization with an item id closes that item's entry, or an entry
    /// built from id-less deltas. Without an id it closes the oldest one.
    fn pending_for_final(&self, speaker: Speaker, item_id: Option<&str>) -> Option<usize> {
        let oldest_without_id = || {
            self.pending
                .iter()
                .position(|p| p.speaker == speaker && p.item_id.is_none())
        };
        match item_id {
            Some(_) => self
                .pending_for_delta(speaker, item_id)
                .or_else(oldest_without_id),
            None => self.pending.iter().position(|p| p.speaker == speaker),
        }
    }

    fn push(&mut self, speaker: Speaker, text: String, is_final: bool) -> usize {
        self.next_id += 1;
        self.entries.push(TranscriptEntry {
            id: self.next_id,
            speaker,
            text,
            timestamp: Utc::now(),
            is_final,
        });
        self.entries.len() - 1
    }

    /// Extends the in-progress entry of the speaker's item, creating it if
    /// needed.
    pub fn append_delta(
        &mut self,
        speaker: Speaker,
        item_id: Option<&str>,
        delta: &str,
    ) -> Option<&TranscriptEntry> {
        if delta.is_empty() {
            return None;
        }
        let index = match self.pending_for_delta(speaker, item_id) {
            Some(slot) => {
                let index = self.pending[slot].index;
                let entry = &mut self.entries[index];
                entry.text.push_str(delta);
                entry.timestamp = Utc::now();
                index
            }
            None => {
                let index = self.push(speaker, delta.to_string(), false);
                self.pending.push(Pending {
                    speaker,
                    item_id: item_id.map(str::to_string),
                    index,
                });
                index
            }
        };
        Some(&self.entries[index])
    }

    /// Finalizes the matching in-progress entry with `text`, or appends a new
    /// final entry when none is in progress. An empty `text` keeps the
    /// accumulated deltas.
    pub fn finalize(
        &mut self,
        speaker: Speaker,
        item_id: Option<&str>,
        text: &str,
    ) -> Option<&TranscriptEntry> {
        let index = match self.pending_for_final(speaker, item_id) {
            Some(slot) => {
                let index = self.pending.remove(slot).index;
                let entry = &mut self.entries[index];
                if !text.is_empty() {
                    entry.text = text.to_string();
                }
                entry.is_final = true;
                entry.timestamp = Utc::now();
                index
            }
            None => return self.push_final(speaker, text),
        };
        Some(&self.entries[index])
    }

    /// Appends a final entry without touching anything in progress.
    pub fn push_final(&mut self, speaker: Speaker, text: &str) -> Option<&TranscriptEntry> {
        if text.is_empty() {
            return None;
        }
        let index = self.push(speaker, text.to_string(), true);
        Some(&self.entries[index])
    }

    /// Closes every in-progress entry of the speaker as is.
    pub fn finalize_pending(&mut self, speaker: Speaker) -> Vec<TranscriptEntry> {
        let mut closed = Vec::new();
        let entries = &mut self.entries;
        self.pending.retain(|p| {
            if p.speaker != speaker {
                return true;
            }
            let entry = &mut entries[p.index];
            entry.is_final = true;
            entry.timestamp = Utc::now();
            closed.push(entry.clone());
            false
        });
        closed
    }
}
