mod config;
mod conversation;
mod directive;
mod email_client;
mod errors;
mod models;
mod openai_client;
mod resolver;
mod scheduling;
mod store;
mod summary;
mod twilio_client;
mod twiml;
mod webhook_handler;
mod webhook_models;

use axum::{
    routing::{get, post},
    Router,
};
use moka::future::Cache;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::email_client::EmailClient;
use crate::openai_client::OpenAiClient;
use crate::store::PgStore;
use crate::twilio_client::TwilioClient;
use crate::webhook_handler::AppState;

/// Main entry point.
///
/// Initializes logging, configuration, the database pool, external API
/// clients, and the webhook routes, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_call_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;
    tracing::info!("Database connection pool established");

    // External API clients
    let openai = OpenAiClient::new(&config)?;
    let twilio = TwilioClient::new(&config)?;
    let email = EmailClient::new(&config)?;

    // Summary in-flight guard: one entry per call while a summary is being
    // generated, so retried status callbacks don't double-summarize.
    let summary_inflight = Cache::builder()
        .time_to_live(Duration::from_secs(300))
        .max_capacity(10_000)
        .build();
    tracing::info!("Summary deduplication cache initialized");

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        store: Arc::new(PgStore::new(pool)),
        openai,
        twilio,
        email,
        summary_inflight,
    });

    // Twilio posts form bodies; 1MB is generous headroom for any callback.
    let webhook_routes = Router::new()
        .route(
            webhook_handler::WEBHOOK_PATH,
            post(webhook_handler::voice_webhook).get(webhook_handler::voice_webhook),
        )
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(1024 * 1024)));

    let app = Router::new()
        .route("/health", get(webhook_handler::health))
        .merge(webhook_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
