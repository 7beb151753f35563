//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Performs business logic (validation, service calls)
//! 3. Returns HTTP response (JSON, status code)

/// Analytics event endpoints
pub mod events;
/// Health check endpoint
pub mod health;
/// CD key management and expiry sweep endpoints
pub mod keys;
/// Key report endpoints
pub mod reports;
