//! Main Entrypoint for the Receptionist API Service
//!
//! Loads configuration, wires the catalog, appointment store, notifier and
//! realtime broker together, then serves the router until `Ctrl+C`.

use anyhow::Context;
use receptionist_api::{
    broker::OpenAIBroker, config::Config, db::PgAppointmentRepository, router::create_router,
    state::AppState,
};
use receptionist_core::{
    BusinessCatalog, ReceptionistService,
    appointments::{AppointmentRepository, InMemoryAppointmentRepository},
    notifier::{LogNotifier, Notifier, TelegramNotifier},
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal. Shutting down gracefully..."),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Business Catalog ---
    let catalog = match &config.businesses_path {
        Some(path) => BusinessCatalog::from_json_file(path)?,
        None => BusinessCatalog::demo(),
    };
    info!(personas = catalog.len(), "Business catalog loaded.");

    // --- 4. Appointment Store ---
    let repository: Arc<dyn AppointmentRepository> = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .context("Failed to connect to database")?;
            let repository = PgAppointmentRepository::new(pool);
            repository.run_migrations().await?;
            info!("Database connection established and migrations are up-to-date.");
            Arc::new(repository)
        }
        None => {
            warn!("DATABASE_URL not set. Appointments are kept in memory and lost on restart.");
            Arc::new(InMemoryAppointmentRepository::new())
        }
    };

    // --- 5. Notifications ---
    let notifier: Arc<dyn Notifier> = match config.telegram_bot_token {
        Some(token) => Arc::new(TelegramNotifier::new(token)),
        None => {
            info!("TELEGRAM_BOT_TOKEN not set. Booking notifications are logged only.");
            Arc::new(LogNotifier)
        }
    };

    let receptionist = ReceptionistService::new(Arc::new(catalog), repository, notifier);
    let broker = OpenAIBroker::new(
        config.openai_api_key,
        config.openai_api_base.as_str(),
        config.realtime_model.as_str(),
    );

    let app_state = Arc::new(AppState {
        receptionist: Arc::new(receptionist),
        broker: Arc::new(broker),
    });

    // --- 6. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 7. Start Server ---
    info!(
        model = %config.realtime_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
