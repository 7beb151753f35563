//! Key report HTTP handlers.
//!
//! This module implements the visitor-facing report endpoints:
//! - POST /api/v1/reports/duplicate-check - Has this visitor already reported this key?
//! - POST /api/v1/reports - Submit a new report
//! - POST /api/v1/reports/renew - Change an owned report's event type
//!
//! Every endpoint here needs the visitor fingerprint; a request whose
//! source address cannot be hashed is rejected before any store access,
//! because admitting it would bypass deduplication entirely.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    fingerprint,
    models::report::{
        CreateReportRequest, DuplicateCheckRequest, DuplicateCheckResponse, RenewReportRequest,
        RenewReportResponse, ReportSummary,
    },
    services::report_service::{self, CreateOutcome},
    state::AppState,
};

/// Check whether the caller already reported a key.
///
/// # Request Body
///
/// ```json
/// {
///   "program_slug": "vpn-tool",
///   "key": "XYZ-123"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "is_duplicate": true,
///   "existing_report": {
///     "id": "550e8400-...",
///     "event_type": "report_key_working",
///     "program_slug": "vpn-tool",
///     "key_hash": "9f86d08...",
///     "key_mask": "XYZ-****-123",
///     "created_at": "2026-01-10T12:00:00Z"
///   }
/// }
/// ```
///
/// Read-only: a `false` answer twice in a row is expected when no create
/// happened in between.
pub async fn duplicate_check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DuplicateCheckRequest>,
) -> Result<Json<DuplicateCheckResponse>, AppError> {
    let params = request.validate()?;
    let visitor = fingerprint::visitor_hash(&headers, &state.config.visitor_hash_salt)?;

    let response = report_service::check_duplicate(&state.pool, &visitor, params).await?;

    Ok(Json(response))
}

/// Submit a new key report.
///
/// # Request Body
///
/// ```json
/// {
///   "program_slug": "vpn-tool",
///   "key": "XYZ-123",
///   "event_type": "report_key_working"
/// }
/// ```
///
/// # Response
///
/// - **201 Created** with the stored report when the tuple was new
/// - **200 OK** with the existing report when this visitor already
///   reported this key (nothing is stored; renewal is a separate
///   operation the owner triggers explicitly)
pub async fn create_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateReportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let params = request.validate()?;
    let visitor = fingerprint::visitor_hash(&headers, &state.config.visitor_hash_salt)?;

    let outcome = report_service::create_report(&state.pool, &visitor, params).await?;

    let (status, report) = match outcome {
        CreateOutcome::Created(report) => (StatusCode::CREATED, report),
        CreateOutcome::Duplicate(report) => (StatusCode::OK, report),
    };

    Ok((status, Json(ReportSummary::from(report))))
}

/// Change the event type of an existing report.
///
/// # Request Body
///
/// ```json
/// {
///   "report_id": "550e8400-...",
///   "new_event_type": "report_key_expired",
///   "program_slug": "vpn-tool",
///   "key": "XYZ-123"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "updated_report": { "id": "550e8400-...", "event_type": "report_key_expired", ... }
/// }
/// ```
///
/// # Security
///
/// Only the report's original visitor can renew it. A wrong visitor and a
/// nonexistent id both answer 404.
pub async fn renew_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RenewReportRequest>,
) -> Result<Json<RenewReportResponse>, AppError> {
    let params = request.validate()?;
    let visitor = fingerprint::visitor_hash(&headers, &state.config.visitor_hash_salt)?;

    tracing::debug!(
        report_id = %params.report_id,
        program = %params.program_slug,
        key = %fingerprint::key_mask(&params.key),
        "renew requested"
    );

    let updated = report_service::renew_report(
        &state.pool,
        &visitor,
        params.report_id,
        params.new_event_type.as_str(),
    )
    .await?;

    Ok(Json(RenewReportResponse {
        updated_report: ReportSummary::from(updated),
    }))
}
