//! CD-Key Report Service - Main Application Entry Point
//!
//! This is the backend API for a CD-key directory website. Visitors report
//! whether keys work (deduplicated per visitor via salted IP fingerprints),
//! the expiry sweep retires keys past their validity window, and a small
//! admin surface manages keys and reads analytics.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Deduplication**: SHA-256 fingerprints of (source address + salt)
//! - **Admin Authentication**: bearer key with SHA-256 hashing
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Bootstrap an admin key on first start
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod config;
mod db;
mod error;
mod fingerprint;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // First start on an empty database gets a bootstrap admin key
    services::admin_service::ensure_bootstrap_key(&pool).await?;

    let state = AppState {
        pool,
        config: Arc::new(config),
        // Reused for revalidation pings; short timeout so a slow frontend
        // never stalls a sweep response
        http: reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()?,
    };

    // Create admin routes (key management + analytics)
    let admin_routes = Router::new()
        // Key management routes
        .route("/api/v1/keys", post(handlers::keys::create_key))
        .route(
            "/api/v1/programs/{slug}/keys",
            get(handlers::keys::list_program_keys),
        )
        .route(
            "/api/v1/keys/{id}/status",
            patch(handlers::keys::override_key_status),
        )
        // Global expiry sweep (manual or scheduled trigger)
        .route("/api/v1/keys/sweep", post(handlers::keys::sweep_all))
        // Analytics
        .route(
            "/api/v1/events/summary",
            get(handlers::events::events_summary),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Combine public routes with admin routes
    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        // Visitor report routes
        .route(
            "/api/v1/reports/duplicate-check",
            post(handlers::reports::duplicate_check),
        )
        .route("/api/v1/reports", post(handlers::reports::create_report))
        .route(
            "/api/v1/reports/renew",
            post(handlers::reports::renew_report),
        )
        // Throttled per-program sweep trigger, fired on page render
        .route(
            "/api/v1/programs/{slug}/keys/sweep",
            post(handlers::keys::sweep_program),
        )
        // Analytics ingestion
        .route("/api/v1/events", post(handlers::events::record_event))
        // Merge admin routes
        .merge(admin_routes)
        // Tracing for observability, CORS because the site frontend calls
        // these endpoints from the browser
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        // Share state with all handlers via State extraction
        .with_state(state.clone());

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", state.config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
