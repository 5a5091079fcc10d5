//! API Models
//!
//! Request and response bodies of the HTTP API, annotated for `utoipa`.

use chrono::{DateTime, NaiveDateTime, Utc};
use receptionist_core::{
    BusinessContext, appointments::Appointment, business::AgentPersona,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct SessionRequest {
    /// Persona key, e.g. `barber`. Defaults to the barber persona.
    #[schema(example = "barber")]
    #[serde(default)]
    pub persona: Option<String>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ClientSecret {
    pub value: String,
    pub expires_at: Option<i64>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSummary {
    pub id: String,
    pub name: String,
    pub agent_name: String,
    pub greeting: String,
}

impl From<&BusinessContext> for BusinessSummary {
    fn from(business: &BusinessContext) -> Self {
        Self {
            id: business.id.clone(),
            name: business.name.clone(),
            agent_name: business.persona.name.clone(),
            greeting: business.persona.greeting.clone(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct SessionResponse {
    pub client_secret: ClientSecret,
    /// Provider session configuration to send as the first `session.update`.
    #[schema(value_type = Object)]
    pub session_config: Value,
    pub business: BusinessSummary,
}

#[derive(Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRequest {
    #[serde(default)]
    #[schema(example = "barber")]
    pub persona: Option<String>,
    #[schema(example = "check_availability")]
    pub function_name: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub function_args: Value,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct FunctionResponse {
    /// Tool result, or `{"error": ...}` when the tool failed.
    #[schema(value_type = Object)]
    pub result: Value,
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PersonaSummary {
    pub persona: String,
    pub business_id: String,
    pub business_name: String,
    pub category: String,
    pub agent_name: String,
    pub language: String,
}

impl PersonaSummary {
    pub fn new(persona: &str, business: &BusinessContext) -> Self {
        let AgentPersona { name, language, .. } = &business.persona;
        Self {
            persona: persona.to_string(),
            business_id: business.id.clone(),
            business_name: business.name.clone(),
            category: business.category.clone(),
            agent_name: name.clone(),
            language: language.clone(),
        }
    }
}

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct AppointmentQuery {
    /// Day to list, `YYYY-MM-DD`. All days when omitted.
    #[param(example = "2024-06-10")]
    pub date: Option<String>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub service: String,
    #[schema(value_type = String, example = "2024-06-10T10:30:00")]
    pub starts_at: NaiveDateTime,
    pub duration_minutes: u32,
    #[schema(example = "confirmed")]
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentResponse {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id,
            customer_name: appointment.customer_name,
            customer_phone: appointment.customer_phone,
            service: appointment.service,
            starts_at: appointment.starts_at,
            duration_minutes: appointment.duration_minutes,
            status: appointment.status.to_string(),
            notes: appointment.notes,
            created_at: appointment.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
