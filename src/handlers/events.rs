//! Analytics event HTTP handlers.
//!
//! - POST /api/v1/events - Record a page view or interaction event (public)
//! - GET /api/v1/events/summary - Grouped counts (admin)

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    error::AppError,
    fingerprint,
    models::event::{EventResponse, RecordEventRequest},
    services::event_service::{self, EventSummary},
    state::AppState,
};

/// Record an analytics event.
///
/// # Request Body
///
/// ```json
/// {
///   "event_type": "page_view",
///   "program_slug": "vpn-tool",
///   "path": "/vpn-tool"
/// }
/// ```
///
/// # Response (201)
///
/// Returns the stored event. The visitor is recorded as a fingerprint
/// hash, never as a raw address.
pub async fn record_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RecordEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let params = request.validate()?;
    let visitor = fingerprint::visitor_hash(&headers, &state.config.visitor_hash_salt)?;

    let event = event_service::record_event(&state.pool, &visitor, params).await?;

    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}

/// Query parameters for the summary endpoint.
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Only count events at or after this instant
    pub since: Option<DateTime<Utc>>,
}

/// Grouped event counts for the admin dashboard.
///
/// # Response (200)
///
/// ```json
/// {
///   "total": 7,
///   "by_event": { "page_view": 3, "key_copy": 1, "social_click": 3 },
///   "by_program": { "vpn-tool": 3, "photoshop-cc": 1 },
///   "by_social": { "twitter": 2, "reddit": 1 }
/// }
/// ```
pub async fn events_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<EventSummary>, AppError> {
    let summary = event_service::fetch_summary(&state.pool, query.since).await?;

    Ok(Json(summary))
}
