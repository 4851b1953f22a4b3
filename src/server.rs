//! # Server Configuration
//!
//! This module contains the server setup and wiring for the concierge intake
//! service: application state, router construction, worker pool lifecycle,
//! and graceful shutdown.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::clients::Collaborators;
use crate::config::AppConfig;
use crate::db;
use crate::handlers;
use crate::pipeline::{JobQueue, KeywordTakeover, Pipeline, WorkerPool};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<Pipeline>,
    pub queue: JobQueue,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/webhooks/messaging", post(handlers::webhooks::inbound_message))
        .route(
            "/webhooks/messaging/status",
            post(handlers::webhooks::message_status),
        )
        .route("/webchat/session", post(handlers::chat::open_session))
        .route(
            "/webchat/{conversation_id}/messages",
            get(handlers::chat::list_messages),
        )
        .route(
            "/webchat/{conversation_id}/send",
            post(handlers::chat::send_message),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration: connects the store, runs
/// migrations, starts the worker pool, and serves until SIGINT/SIGTERM.
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let config = Arc::new(config);

    let database = db::init_pool(&config).await?;
    migration::Migrator::up(&database, None).await?;

    let collaborators = Collaborators::from_config(&config)?;
    let pipeline = Arc::new(Pipeline::new(
        database.clone(),
        Arc::clone(&config),
        collaborators,
        Arc::new(KeywordTakeover),
    ));

    let shutdown = CancellationToken::new();
    let (queue, pool) = WorkerPool::start(
        Arc::clone(&pipeline),
        config.pipeline.workers,
        config.pipeline.queue_capacity,
        shutdown.clone(),
    );

    let state = AppState {
        db: database,
        config: Arc::clone(&config),
        pipeline,
        queue,
    };
    let app = create_app(state);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "Server listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await?;

    // Drain the workers before exit so accepted jobs finish
    shutdown.cancel();
    pool.join().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::webhooks::inbound_message,
        crate::handlers::webhooks::message_status,
        crate::handlers::chat::open_session,
        crate::handlers::chat::list_messages,
        crate::handlers::chat::send_message,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::chat::SessionRequest,
            crate::handlers::chat::SessionResponse,
            crate::handlers::chat::MessageView,
            crate::handlers::chat::MessagesResponse,
            crate::handlers::chat::SendRequest,
            crate::handlers::chat::SendResponse,
        )
    ),
    info(
        title = "Concierge Intake API",
        description = "Customer message intake, classification, and provider dispatch",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
