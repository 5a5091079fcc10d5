use thiserror::Error;

/// Failures while executing a receptionist tool.
///
/// These are recovered by the caller and reported to the model as an
/// `{error}` payload.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown function")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid date and time: {0}")]
    InvalidDateTime(String),
    #[error("Unknown persona: {0}")]
    UnknownPersona(String),
    #[error("Appointment storage failed: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Failed to encode tool result: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Appointment not found: {0}")]
    NotFound(uuid::Uuid),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Notification rejected with status {0}")]
    Rejected(reqwest::StatusCode),
}
