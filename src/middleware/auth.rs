//! Admin key authentication middleware.
//!
//! This middleware intercepts every admin request to:
//! 1. Extract the admin key from the Authorization header
//! 2. Hash it and verify it exists in the database
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized requests with HTTP 401
//!
//! Visitor-facing endpoints (reports, events, public sweep triggers) are
//! deliberately unauthenticated; only the key-management and analytics
//! surface sits behind this middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    error::AppError, models::admin_key::AdminKey, services::admin_service, state::AppState,
};

/// Authentication context attached to authenticated admin requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers to know who made the request.
#[derive(Debug, Clone)]
pub struct AdminContext {
    /// ID of the authenticated admin key
    pub admin_key_id: Uuid,

    /// Label of the key making the request
    pub label: String,
}

/// Admin key authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>` header from request
/// 2. Hash the `<key>` using SHA-256
/// 3. Query database for matching hash where `is_active = true`
/// 4. If found: inject `AdminContext` into request, call next handler
/// 5. If not found: return 401 Unauthorized error
///
/// # Headers
///
/// Expected header format:
/// ```
/// Authorization: Bearer abc123xyz
/// ```
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Step 1: Extract Authorization header
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidAdminKey)?;

    // Step 2: Extract Bearer token
    // Expected format: "Bearer <admin_key>"
    let admin_key = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidAdminKey)?;

    // Step 3: Hash the admin key using SHA-256
    let key_hash = admin_service::hash_admin_key(admin_key);

    // Step 4: Lookup hashed key in database
    let record = sqlx::query_as::<_, AdminKey>(
        "SELECT id, key_hash, label, created_at, is_active
         FROM admin_keys
         WHERE key_hash = $1 AND is_active = true",
    )
    .bind(&key_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::InvalidAdminKey)?;

    // Step 5: Create authentication context
    let context = AdminContext {
        admin_key_id: record.id,
        label: record.label,
    };

    // Step 6: Inject context into request extensions
    // Route handlers can now extract this using Extension<AdminContext>
    request.extensions_mut().insert(context);

    // Step 7: Call the next middleware/handler
    Ok(next.run(request).await)
}
