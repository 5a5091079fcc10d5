//! Business domain of the AI receptionist: personas and their businesses,
//! the system prompt and tool schemas handed to the realtime model, slot
//! availability, appointment storage and the tool execution service.

pub mod appointments;
pub mod business;
pub mod error;
pub mod notifier;
pub mod prompt;
pub mod receptionist;
pub mod scheduling;
pub mod session_config;
pub mod tools;

pub use business::{BusinessCatalog, BusinessContext, select_voice};
pub use error::ToolError;
pub use receptionist::ReceptionistService;
pub use session_config::SessionConfig;
