use std::time::Duration;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview-2024-12-17";
pub const DEFAULT_DATA_CHANNEL: &str = "oai-events";

/// Client-side settings for realtime voice sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct RealtimeConfig {
    /// Base URL of the receptionist backend (credential and tool endpoints).
    pub backend_url: String,
    /// Base URL of the realtime provider used for the SDP exchange.
    pub provider_url: String,
    pub model: String,
    /// Upper bound for the SDP exchange and for the provider acknowledgment.
    pub negotiation_timeout: Duration,
    pub data_channel_label: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3000".to_string(),
            provider_url: "https://api.openai.com/v1".to_string(),
            model: DEFAULT_MODEL.to_string(),
            negotiation_timeout: Duration::from_secs(15),
            data_channel_label: DEFAULT_DATA_CHANNEL.to_string(),
        }
    }
}

impl RealtimeConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let defaults = Self::default();

        let backend_url = std::env::var("RECEPTIONIST_BACKEND_URL")
            .unwrap_or(defaults.backend_url)
            .trim_end_matches('/')
            .to_string();
        let provider_url = std::env::var("REALTIME_PROVIDER_URL")
            .unwrap_or(defaults.provider_url)
            .trim_end_matches('/')
            .to_string();
        let model = std::env::var("REALTIME_MODEL").unwrap_or(defaults.model);

        let negotiation_timeout = match std::env::var("REALTIME_NEGOTIATION_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidValue(
                        "REALTIME_NEGOTIATION_TIMEOUT_SECS".to_string(),
                        e.to_string(),
                    )
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue(
                        "REALTIME_NEGOTIATION_TIMEOUT_SECS".to_string(),
                        "must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            Err(_) => defaults.negotiation_timeout,
        };

        let data_channel_label =
            std::env::var("REALTIME_DATA_CHANNEL").unwrap_or(defaults.data_channel_label);

        Ok(Self {
            backend_url,
            provider_url,
            model,
            negotiation_timeout,
            data_channel_label,
        })
    }
}
