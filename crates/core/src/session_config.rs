//! Realtime session configuration.
//!
//! Built by the backend for one persona and forwarded verbatim by the client
//! as the body of the first `session.update` event.

use crate::{
    business::BusinessContext,
    prompt::system_prompt,
    tools::{ToolDefinition, tool_definitions},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionConfig {
    pub model: String,
}

/// Server-side voice activity detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self {
            kind: "server_vad".to_string(),
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    pub modalities: Vec<String>,
    pub instructions: String,
    pub voice: String,
    pub input_audio_format: String,
    pub output_audio_format: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub input_audio_transcription: Option<TranscriptionConfig>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub turn_detection: Option<TurnDetection>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: String,
    pub temperature: f32,
    pub max_response_output_tokens: u32,
}

impl SessionConfig {
    /// The standard receptionist configuration for a business.
    pub fn for_business(business: &BusinessContext, voice: &str) -> Self {
        Self {
            modalities: vec!["text".to_string(), "audio".to_string()],
            instructions: system_prompt(business),
            voice: voice.to_string(),
            input_audio_format: "pcm16".to_string(),
            output_audio_format: "pcm16".to_string(),
            input_audio_transcription: Some(TranscriptionConfig {
                model: "whisper-1".to_string(),
            }),
            turn_detection: Some(TurnDetection::default()),
            tools: tool_definitions(),
            tool_choice: "auto".to_string(),
            temperature: 0.8,
            max_response_output_tokens: 200,
        }
    }
}
