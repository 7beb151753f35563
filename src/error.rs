//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Store Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Invalid or missing admin keys
/// - **Validation Errors**: Missing fields, unknown event types, bad values
/// - **Fingerprint Errors**: The visitor's source address could not be hashed
/// - **Ownership Errors**: Renew target missing or owned by another visitor
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Store error: {0}")]
    Database(#[from] sqlx::Error),

    /// Admin key is missing, invalid, or inactive.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid admin key")]
    InvalidAdminKey,

    /// A required request field was absent.
    ///
    /// Returns HTTP 400 Bad Request. The field name is included so the
    /// caller knows what to fix.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Report event type outside the enumerated set.
    ///
    /// Returns HTTP 400 Bad Request. Checked before any store access,
    /// so a rejected request has no side effect.
    #[error("Invalid report event type")]
    InvalidEventType,

    /// The visitor's source address could not be turned into a fingerprint.
    ///
    /// Returns HTTP 400 Bad Request. Deduplication is meaningless without
    /// a fingerprint, so the request is rejected rather than admitted.
    #[error("Visitor fingerprint unavailable")]
    FingerprintUnavailable,

    /// Renew target does not exist, or the caller is not its original visitor.
    ///
    /// Returns HTTP 404 Not Found. The two cases are deliberately
    /// indistinguishable so a non-owner cannot probe for report existence.
    #[error("Report not found")]
    NotFoundOrAccessDenied,

    /// Requested CD key does not exist.
    ///
    /// Returns HTTP 404 Not Found. Admin surface only.
    #[error("Key not found")]
    KeyNotFound,

    /// A public sweep trigger arrived inside the minimum interval.
    ///
    /// Returns HTTP 429 Too Many Requests.
    #[error("Sweep already ran recently")]
    SweepThrottled,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidAdminKey` → 401 Unauthorized
/// - `MissingField` / `InvalidEventType` / `FingerprintUnavailable` /
///   `InvalidRequest` → 400 Bad Request
/// - `NotFoundOrAccessDenied` → 404 Not Found
/// - `SweepThrottled` → 429 Too Many Requests
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::InvalidAdminKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_admin_key",
                self.to_string(),
            ),
            AppError::MissingField(_) => {
                (StatusCode::BAD_REQUEST, "missing_field", self.to_string())
            }
            AppError::InvalidEventType => (
                StatusCode::BAD_REQUEST,
                "invalid_event_type",
                self.to_string(),
            ),
            AppError::FingerprintUnavailable => (
                StatusCode::BAD_REQUEST,
                "fingerprint_unavailable",
                self.to_string(),
            ),
            AppError::NotFoundOrAccessDenied => {
                (StatusCode::NOT_FOUND, "report_not_found", self.to_string())
            }
            AppError::KeyNotFound => (StatusCode::NOT_FOUND, "key_not_found", self.to_string()),
            AppError::SweepThrottled => (
                StatusCode::TOO_MANY_REQUESTS,
                "sweep_throttled",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(ref e) => {
                // Operator visibility; the client only sees a generic message
                tracing::error!("store failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_failure",
                    "An internal error occurred".to_string(),
                )
            }
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_map_to_bad_request() {
        for err in [
            AppError::MissingField("program_slug"),
            AppError::InvalidEventType,
            AppError::FingerprintUnavailable,
            AppError::InvalidRequest("bad".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn ownership_failure_maps_to_not_found() {
        assert_eq!(
            AppError::NotFoundOrAccessDenied.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn throttled_sweep_maps_to_too_many_requests() {
        assert_eq!(
            AppError::SweepThrottled.into_response().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn store_failure_hides_details() {
        let response = AppError::Database(sqlx::Error::PoolClosed).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
