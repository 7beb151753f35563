//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `VISITOR_HASH_SALT` (optional): server-side secret mixed into visitor
///   fingerprints, defaults to the empty string
/// - `SWEEP_MIN_INTERVAL_SECS` (optional): minimum seconds between two
///   public expiry-sweep runs for the same program, defaults to 300
/// - `REVALIDATE_URL` (optional): frontend endpoint to ping when key
///   statuses change; revalidation is disabled when unset
/// - `REVALIDATE_SECRET` (optional): secret used to HMAC-sign revalidation
///   pings
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    /// Secret salt mixed into visitor fingerprints.
    ///
    /// An empty salt still produces valid fingerprints; it just makes them
    /// reproducible by anyone who knows the hashing scheme.
    #[serde(default)]
    pub visitor_hash_salt: String,

    #[serde(default = "default_sweep_interval")]
    pub sweep_min_interval_secs: u64,

    pub revalidate_url: Option<String>,

    pub revalidate_secret: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

/// Default minimum interval between per-program sweep runs.
fn default_sweep_interval() -> u64 {
    300
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }
}
