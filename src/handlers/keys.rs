//! CD key management and expiry sweep HTTP handlers.
//!
//! Admin endpoints (behind bearer-key auth):
//! - POST /api/v1/keys - Enter a new key
//! - GET /api/v1/programs/:slug/keys - List a program's keys
//! - PATCH /api/v1/keys/:id/status - Manual status override
//! - POST /api/v1/keys/sweep - Run the expiry sweep over all programs
//!
//! Public endpoint:
//! - POST /api/v1/programs/:slug/keys/sweep - Per-program sweep trigger,
//!   throttled through the shared gate (the site frontend fires this when
//!   it renders a program page)

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AdminContext,
    models::key::{CdKey, CreateKeyRequest, UpdateKeyStatusRequest},
    services::{key_service, revalidate_service},
    state::AppState,
};

/// Aggregate sweep result returned to the caller.
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    /// True when every candidate key was patched
    pub success: bool,

    /// Human-readable outcome
    pub message: String,

    /// Keys moved to `expired`
    pub expired: u64,

    /// Keys whose patch failed (they stay candidates for the next run)
    pub failed: u64,
}

impl SweepResponse {
    fn from_outcome(outcome: &key_service::SweepOutcome) -> Self {
        Self {
            success: outcome.failed == 0,
            message: format!(
                "expired {} key(s), {} failure(s)",
                outcome.expired, outcome.failed
            ),
            expired: outcome.expired,
            failed: outcome.failed,
        }
    }
}

/// Enter a new CD key.
///
/// # Request Body
///
/// ```json
/// {
///   "program_slug": "photoshop-cc",
///   "key": "ABC-123",
///   "status": "active",
///   "valid_until": "2026-12-31T00:00:00Z"
/// }
/// ```
///
/// # Response (201)
///
/// Returns the stored key.
pub async fn create_key(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    Json(request): Json<CreateKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let params = request.validate()?;

    let key = key_service::create_key(&state.pool, params).await?;

    tracing::info!(
        admin = %admin.label,
        admin_id = %admin.admin_key_id,
        program = %key.program_slug,
        "key entered"
    );

    Ok((StatusCode::CREATED, Json(key)))
}

/// List all keys for a program, newest first.
pub async fn list_program_keys(
    State(state): State<AppState>,
    Path(program_slug): Path<String>,
) -> Result<Json<Vec<CdKey>>, AppError> {
    let keys = key_service::list_program_keys(&state.pool, &program_slug).await?;

    Ok(Json(keys))
}

/// Manually override a key's status.
///
/// # Request Body
///
/// ```json
/// { "status": "limit" }
/// ```
///
/// # Response
///
/// - **200 OK** with the updated key
/// - **404** if the key id does not resolve
/// - **400** for a status outside new/active/expired/limit
pub async fn override_key_status(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    Path(key_id): Path<Uuid>,
    Json(request): Json<UpdateKeyStatusRequest>,
) -> Result<Json<CdKey>, AppError> {
    let status = request.validate()?;

    let key = key_service::set_key_status(&state.pool, key_id, status).await?;

    tracing::info!(
        admin = %admin.label,
        key_id = %key.id,
        status = %key.status,
        "key status overridden"
    );

    // The program page now shows a stale status; ask for a re-render
    revalidate_service::notify_program_pages(
        &state.http,
        &state.config,
        std::slice::from_ref(&key.program_slug),
    )
    .await;

    Ok(Json(key))
}

/// Run the expiry sweep over all programs.
///
/// Admin-triggered (manual or scheduled). Per-key failures never abort the
/// batch; the response carries the aggregate counts.
pub async fn sweep_all(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
) -> Result<Json<SweepResponse>, AppError> {
    let outcome = key_service::run_expiry_sweep(&state.pool, None).await?;

    tracing::info!(
        admin = %admin.label,
        expired = outcome.expired,
        failed = outcome.failed,
        "expiry sweep ran"
    );

    if outcome.expired > 0 {
        revalidate_service::notify_program_pages(&state.http, &state.config, &outcome.programs)
            .await;
    }

    Ok(Json(SweepResponse::from_outcome(&outcome)))
}

/// Per-program sweep trigger.
///
/// Public: the site frontend fires this when it renders a program page.
/// The shared gate admits one run per program per configured interval,
/// across all server instances; throttled triggers receive 429 and the
/// page renders with whatever statuses are already stored.
pub async fn sweep_program(
    State(state): State<AppState>,
    Path(program_slug): Path<String>,
) -> Result<Json<SweepResponse>, AppError> {
    let acquired = key_service::try_acquire_sweep_gate(
        &state.pool,
        &program_slug,
        state.config.sweep_min_interval_secs,
    )
    .await?;

    if !acquired {
        return Err(AppError::SweepThrottled);
    }

    let outcome = key_service::run_expiry_sweep(&state.pool, Some(&program_slug)).await?;

    if outcome.expired > 0 {
        revalidate_service::notify_program_pages(&state.http, &state.config, &outcome.programs)
            .await;
    }

    Ok(Json(SweepResponse::from_outcome(&outcome)))
}
