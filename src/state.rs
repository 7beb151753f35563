//! Shared application state.
//!
//! One `AppState` value is built at startup and cloned into every handler
//! via Axum's `State` extractor. Everything inside is cheaply clonable:
//! the pool and HTTP client are handles, the config is behind an `Arc`.

use std::sync::Arc;

use crate::{config::Config, db::DbPool};

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: DbPool,

    /// Process-wide configuration, read once at startup
    pub config: Arc<Config>,

    /// Reusable HTTP client for outbound revalidation pings
    pub http: reqwest::Client,
}
