//! Axum Router Configuration
//!
//! HTTP routing for the receptionist backend plus the OpenAPI documentation.

use crate::{
    handlers,
    models::{
        AppointmentResponse, BusinessSummary, ClientSecret, ErrorResponse, FunctionRequest,
        FunctionResponse, PersonaSummary, SessionRequest, SessionResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_realtime_session,
        handlers::execute_function,
        handlers::list_personas,
        handlers::list_appointments,
    ),
    components(
        schemas(SessionRequest, SessionResponse, ClientSecret, BusinessSummary, FunctionRequest, FunctionResponse, PersonaSummary, AppointmentResponse, ErrorResponse)
    ),
    tags(
        (name = "Receptionist API", description = "Realtime credentials and tool execution for the AI voice receptionist")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(
            "/realtime/session",
            post(handlers::create_realtime_session),
        )
        .route("/realtime/function", post(handlers::execute_function))
        .route("/personas", get(handlers::list_personas))
        .route(
            "/businesses/{persona}/appointments",
            get(handlers::list_appointments),
        )
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
