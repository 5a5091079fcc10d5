//! Messages exchanged with the realtime provider over the event data channel.

use receptionist_core::SessionConfig;
use serde::{Deserialize, Serialize};

/// Events sent from this client to the provider.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Session configuration. Always the first message on a new channel.
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },
    /// Asks the model to produce a response.
    #[serde(rename = "response.create")]
    ResponseCreate,
    #[serde(rename = "response.cancel")]
    ResponseCancel,
    /// Drops agent audio that is buffered but not yet played.
    #[serde(rename = "output_audio_buffer.clear")]
    OutputAudioBufferClear,
}

impl ClientEvent {
    pub fn user_text(text: impl Into<String>) -> Self {
        ClientEvent::ConversationItemCreate {
            item: ConversationItem::Message {
                role: "user".to_string(),
                content: vec![ContentPart::InputText { text: text.into() }],
            },
        }
    }

    pub fn function_output(call_id: impl Into<String>, output: String) -> Self {
        ClientEvent::ConversationItemCreate {
            item: ConversationItem::FunctionCallOutput {
                call_id: call_id.into(),
                output,
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationItem {
    Message {
        role: String,
        content: Vec<ContentPart>,
    },
    FunctionCallOutput {
        call_id: String,
        /// JSON-encoded tool result.
        output: String,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ProviderErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Events received from the provider. Anything not listed is `Unknown`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "session.created")]
    SessionCreated,
    #[serde(rename = "session.updated")]
    SessionUpdated,
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped,
    #[serde(rename = "response.audio_transcript.delta")]
    AgentTranscriptDelta {
        #[serde(default)]
        item_id: Option<String>,
        delta: String,
    },
    #[serde(rename = "response.audio_transcript.done")]
    AgentTranscriptDone {
        #[serde(default)]
        item_id: Option<String>,
        #[serde(default)]
        transcript: String,
    },
    #[serde(rename = "output_audio_buffer.started", alias = "response.audio.started")]
    AgentAudioStarted,
    #[serde(rename = "output_audio_buffer.stopped", alias = "response.audio.done")]
    AgentAudioStopped,
    #[serde(rename = "response.done")]
    ResponseDone,
    #[serde(rename = "conversation.item.input_audio_transcription.delta")]
    UserTranscriptDelta {
        #[serde(default)]
        item_id: Option<String>,
        delta: String,
    },
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    UserTranscriptCompleted {
        #[serde(default)]
        item_id: Option<String>,
        #[serde(default)]
        transcript: String,
    },
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        call_id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        arguments: String,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: ProviderErrorBody,
    },
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn to_value(event: &ClientEvent) -> Value {
        serde_json::from_str(&event.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_bare_client_events() {
        assert_eq!(to_value(&ClientEvent::ResponseCreate), json!({"type": "response.create"}));
        assert_eq!(to_value(&ClientEvent::ResponseCancel), json!({"type": "response.cancel"}));
        assert_eq!(
            to_value(&ClientEvent::OutputAudioBufferClear),
            json!({"type": "output_audio_buffer.clear"})
        );
    }

    #[test]
    fn test_user_text_item() {
        assert_eq!(
            to_value(&ClientEvent::user_text("Do you have a slot tomorrow?")),
            json!({
                "type": "conversation.item.create",
                "item": {
                    "type": "message",
                    "role": "user",
                    "content": [{"type": "input_text", "text": "Do you have a slot tomorrow?"}]
                }
            })
        );
    }

    #[test]
    fn test_function_output_item() {
        let event = ClientEvent::function_output("call_1", r#"{"info":"x"}"#.to_string());
        assert_eq!(
            to_value(&event),
            json!({
                "type": "conversation.item.create",
                "item": {"type": "function_call_output", "call_id": "call_1", "output": "{\"info\":\"x\"}"}
            })
        );
    }

    #[test]
    fn test_parses_known_events_ignoring_extra_fields() {
        let created = ServerEvent::parse(
            r#"{"type":"session.created","event_id":"evt_1","session":{"id":"sess_1"}}"#,
        )
        .unwrap();
        assert_eq!(created, ServerEvent::SessionCreated);

        let call = ServerEvent::parse(
            r#"{"type":"response.function_call_arguments.done","call_id":"c1","name":"get_business_info","arguments":"{\"info_type\":\"hours\"}","item_id":"i1"}"#,
        )
        .unwrap();
        assert_eq!(
            call,
            ServerEvent::FunctionCallArgumentsDone {
                call_id: "c1".to_string(),
                name: "get_business_info".to_string(),
                arguments: r#"{"info_type":"hours"}"#.to_string(),
            }
        );
    }

    #[test]
    fn test_audio_started_alias_and_unknown_events() {
        assert_eq!(
            ServerEvent::parse(r#"{"type":"response.audio.started"}"#).unwrap(),
            ServerEvent::AgentAudioStarted
        );
        assert_eq!(
            ServerEvent::parse(r#"{"type":"output_audio_buffer.started","response_id":"r"}"#).unwrap(),
            ServerEvent::AgentAudioStarted
        );
        assert_eq!(
            ServerEvent::parse(r#"{"type":"rate_limits.updated","rate_limits":[]}"#).unwrap(),
            ServerEvent::Unknown
        );
        assert!(ServerEvent::parse("not json").is_err());
    }

    #[test]
    fn test_transcription_events_carry_item_id() {
        assert_eq!(
            ServerEvent::parse(
                r#"{"type":"conversation.item.input_audio_transcription.delta","item_id":"item_3","content_index":0,"delta":"Kal"}"#
            )
            .unwrap(),
            ServerEvent::UserTranscriptDelta {
                item_id: Some("item_3".to_string()),
                delta: "Kal".to_string(),
            }
        );
        assert_eq!(
            ServerEvent::parse(r#"{"type":"response.audio_transcript.done"}"#).unwrap(),
            ServerEvent::AgentTranscriptDone {
                item_id: None,
                transcript: String::new(),
            }
        );
    }

    #[test]
    fn test_error_event_message() {
        let event = ServerEvent::parse(
            r#"{"type":"error","error":{"type":"invalid_request_error","message":"Bad tool"}}"#,
        )
        .unwrap();
        match event {
            ServerEvent::Error { error } => assert_eq!(error.message.as_deref(), Some("Bad tool")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
