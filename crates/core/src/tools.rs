//! Tool definitions the realtime model may invoke, together with their typed
//! arguments and result payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{fmt, str::FromStr};

/// The four receptionist tools. Names are part of the provider contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CheckAvailability,
    BookAppointment,
    CancelAppointment,
    GetBusinessInfo,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::CheckAvailability,
        ToolName::BookAppointment,
        ToolName::CancelAppointment,
        ToolName::GetBusinessInfo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::CheckAvailability => "check_availability",
            ToolName::BookAppointment => "book_appointment",
            ToolName::CancelAppointment => "cancel_appointment",
            ToolName::GetBusinessInfo => "get_business_info",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

// --- Arguments ---

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CheckAvailabilityArgs {
    /// `YYYY-MM-DD`, or `today` / `tomorrow`.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BookAppointmentArgs {
    pub customer_name: String,
    pub customer_phone: String,
    pub service: String,
    /// ISO 8601 local date-time.
    pub date_time: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CancelAppointmentArgs {
    pub customer_phone: String,
    #[serde(default)]
    pub appointment_date_time: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InfoType {
    Hours,
    Services,
    Location,
    Prices,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GetBusinessInfoArgs {
    pub info_type: InfoType,
}

// --- Results ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityResult {
    pub slots: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub appointment_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancellationResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessInfoResult {
    pub info: String,
}

// --- Schemas ---

/// A function tool as advertised to the realtime provider in `session.update`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    fn function(name: ToolName, description: &str, parameters: Value) -> Self {
        Self {
            kind: "function".to_string(),
            name: name.as_str().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// JSON-schema definitions for every receptionist tool.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            ToolName::CheckAvailability,
            "Check available appointment slots for a specific date. Call this when the customer asks about availability or wants to book.",
            json!({
                "type": "object",
                "properties": {
                    "date": {
                        "type": "string",
                        "description": "The date to check availability for in YYYY-MM-DD format"
                    },
                    "service": {
                        "type": "string",
                        "description": "Optional: the service name, used to determine the appointment duration"
                    }
                },
                "required": ["date"]
            }),
        ),
        ToolDefinition::function(
            ToolName::BookAppointment,
            "Book a new appointment after the customer confirms all details. Only call after getting customer name, phone, service, and a confirmed date/time.",
            json!({
                "type": "object",
                "properties": {
                    "customer_name": {"type": "string", "description": "Full name of the customer"},
                    "customer_phone": {"type": "string", "description": "Customer's phone number with country code"},
                    "service": {"type": "string", "description": "The service being booked (e.g., Haircut, Facial)"},
                    "date_time": {"type": "string", "description": "Appointment date and time in ISO 8601 format"},
                    "notes": {"type": "string", "description": "Optional notes or special requests"}
                },
                "required": ["customer_name", "customer_phone", "service", "date_time"]
            }),
        ),
        ToolDefinition::function(
            ToolName::CancelAppointment,
            "Cancel an existing appointment. Ask for the phone number and appointment time to identify it.",
            json!({
                "type": "object",
                "properties": {
                    "customer_phone": {"type": "string", "description": "Customer's phone number to look up the appointment"},
                    "appointment_date_time": {"type": "string", "description": "The date and time of the appointment to cancel"}
                },
                "required": ["customer_phone"]
            }),
        ),
        ToolDefinition::function(
            ToolName::GetBusinessInfo,
            "Get information about business hours, services, prices, or location when the customer asks.",
            json!({
                "type": "object",
                "properties": {
                    "info_type": {
                        "type": "string",
                        "enum": ["hours", "services", "location", "prices"],
                        "description": "What information the customer is asking about"
                    }
                },
                "required": ["info_type"]
            }),
        ),
    ]
}
