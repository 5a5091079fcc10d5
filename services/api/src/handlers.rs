//! Axum Handlers for the REST API
//!
//! Credential issuing, tool execution and the read-only catalog and
//! appointment views. Annotated with `utoipa` for the OpenAPI document.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use receptionist_core::{
    SessionConfig, appointments::AppointmentFilter, select_voice,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    db::parse_query_date,
    models::{
        AppointmentQuery, AppointmentResponse, BusinessSummary, ClientSecret, ErrorResponse,
        FunctionRequest, FunctionResponse, PersonaSummary, SessionRequest, SessionResponse,
    },
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// The realtime provider refused or could not be reached.
    Upstream(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Upstream(message) => {
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

fn unknown_persona(persona: &str) -> ApiError {
    ApiError::NotFound(format!("Unknown persona '{persona}'"))
}

/// Issue an ephemeral realtime credential and the session configuration for a persona.
#[utoipa::path(
    post,
    path = "/realtime/session",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Credential issued", body = SessionResponse),
        (status = 404, description = "Unknown persona", body = ErrorResponse),
        (status = 502, description = "Realtime provider unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn create_realtime_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let catalog = state.receptionist.catalog();
    let (persona, business) = catalog
        .resolve(payload.persona.as_deref())
        .ok_or_else(|| unknown_persona(payload.persona.as_deref().unwrap_or_default()))?;

    let voice = select_voice(persona, &business);
    let session_config = serde_json::to_value(SessionConfig::for_business(&business, voice))?;

    let secret = state.broker.create_session(voice).await.map_err(|e| {
        warn!(error = %e, "Realtime provider refused the session");
        ApiError::Upstream("Failed to create realtime session".to_string())
    })?;

    info!(persona, voice, business = %business.id, "Realtime session credential issued");
    Ok(Json(SessionResponse {
        client_secret: ClientSecret {
            value: secret.value.expose_secret().to_string(),
            expires_at: secret.expires_at,
        },
        session_config,
        business: BusinessSummary::from(business.as_ref()),
    }))
}

/// Execute a receptionist tool. Tool failures are reported inside `result`.
#[utoipa::path(
    post,
    path = "/realtime/function",
    request_body = FunctionRequest,
    responses(
        (status = 200, description = "Tool result or error payload", body = FunctionResponse)
    )
)]
pub async fn execute_function(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FunctionRequest>,
) -> Json<FunctionResponse> {
    let result = state
        .receptionist
        .execute_or_error(
            payload.persona.as_deref(),
            &payload.function_name,
            payload.function_args,
        )
        .await;
    Json(FunctionResponse { result })
}

/// List the personas this deployment can answer as.
#[utoipa::path(
    get,
    path = "/personas",
    responses(
        (status = 200, description = "Configured personas", body = [PersonaSummary])
    )
)]
pub async fn list_personas(State(state): State<Arc<AppState>>) -> Json<Vec<PersonaSummary>> {
    let personas = state
        .receptionist
        .catalog()
        .iter()
        .map(|(persona, business)| PersonaSummary::new(persona, business))
        .collect();
    Json(personas)
}

/// List the appointments of a persona's business, optionally for one day.
#[utoipa::path(
    get,
    path = "/businesses/{persona}/appointments",
    params(
        ("persona" = String, Path, description = "Persona key, e.g. `barber`"),
        AppointmentQuery
    ),
    responses(
        (status = 200, description = "Appointments ordered by start time", body = [AppointmentResponse]),
        (status = 400, description = "Invalid date", body = ErrorResponse),
        (status = 404, description = "Unknown persona", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Path(persona): Path<String>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Vec<AppointmentResponse>>, ApiError> {
    let business = state
        .receptionist
        .catalog()
        .get(&persona)
        .ok_or_else(|| unknown_persona(&persona))?;

    let mut filter = AppointmentFilter::for_business(business.id.clone());
    if let Some(raw) = query.date.as_deref() {
        let date = parse_query_date(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("Invalid date '{raw}', expected YYYY-MM-DD"))
        })?;
        filter = filter.on(date);
    }

    let appointments = state.receptionist.repository().list(filter).await?;
    Ok(Json(
        appointments
            .into_iter()
            .map(AppointmentResponse::from)
            .collect(),
    ))
}
