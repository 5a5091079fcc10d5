use secrecy::SecretString;
use std::{fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};
use tracing::Level;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2024-12-17";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Backend settings read once at startup.
#[derive(Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Appointments are kept in memory when unset.
    pub database_url: Option<String>,
    pub openai_api_key: SecretString,
    pub openai_api_base: String,
    pub realtime_model: String,
    /// Booking notifications are only logged when unset.
    pub telegram_bot_token: Option<SecretString>,
    /// JSON business catalog. The built-in demo catalog is used when unset.
    pub businesses_path: Option<PathBuf>,
    pub log_level: Level,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // .env is ignored under test so env-mutating tests stay isolated
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        Ok(Self {
            bind_address: parsed_var("BIND_ADDRESS", DEFAULT_BIND_ADDRESS)?,
            database_url: non_empty_var("DATABASE_URL"),
            openai_api_key: non_empty_var("OPENAI_API_KEY")
                .map(SecretString::from)
                .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?,
            openai_api_base: var_or("OPENAI_API_BASE", DEFAULT_OPENAI_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            realtime_model: var_or("REALTIME_MODEL", DEFAULT_REALTIME_MODEL),
            telegram_bot_token: non_empty_var("TELEGRAM_BOT_TOKEN").map(SecretString::from),
            businesses_path: non_empty_var("BUSINESSES_PATH").map(PathBuf::from),
            log_level: parsed_var("RUST_LOG", "INFO")?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    non_empty_var(name).unwrap_or_else(|| default.to_string())
}

fn parsed_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = var_or(name, default);
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("'{raw}': {e}")))
}
