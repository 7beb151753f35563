//! Admin key model for authentication.
//!
//! Admin keys gate the key-management and analytics endpoints. They are stored in the database as SHA-256 hashes for security.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents an admin key record from the database.
///
/// # Database Table
///
/// Maps to the `admin_keys` table with columns:
/// - `id`: Unique identifier (UUID)
/// - `key_hash`: SHA-256 hash of the actual key
/// - `label`: What this key is for (e.g. "bootstrap", "dashboard")
/// - `created_at`: When the key was created
/// - `is_active`: Whether the key is currently valid
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminKey {
    /// Unique identifier for this admin key
    pub id: Uuid,

    /// SHA-256 hash of the actual key (64 hex characters)
    ///
    /// When a request comes in with "Bearer abc123", we:
    /// 1. Hash "abc123" with SHA-256
    /// 2. Look up this hash in the database
    /// 3. If found and active, authenticate the request
    pub key_hash: String,

    /// Human-readable label for this key
    pub label: String,

    /// Timestamp when this key was created
    pub created_at: DateTime<Utc>,

    /// Whether this key is currently active
    ///
    /// Inactive keys are rejected during authentication. This provides a way to revoke access without deleting the record.
    pub is_active: bool,
}
