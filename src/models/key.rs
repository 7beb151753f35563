//! CD key data model and status lifecycle.
//!
//! This module defines:
//! - `CdKey`: Database entity representing a software license key
//! - `KeyStatus`: The enumerated status lifecycle (new/active/expired/limit)
//! - Request types for admin key creation and status overrides

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::require;

/// Lifecycle status of a CD key.
///
/// - `new`: entered by an administrator, not yet published as working
/// - `active`: believed to be working
/// - `expired`: past its validity window (set by the sweep or manually)
/// - `limit`: activation limit reached (asserted by reports or manually)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    New,
    Active,
    Expired,
    Limit,
}

impl KeyStatus {
    /// Wire representation, as stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            KeyStatus::New => "new",
            KeyStatus::Active => "active",
            KeyStatus::Expired => "expired",
            KeyStatus::Limit => "limit",
        }
    }

    /// Parse a wire value.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "new" => Ok(KeyStatus::New),
            "active" => Ok(KeyStatus::Active),
            "expired" => Ok(KeyStatus::Expired),
            "limit" => Ok(KeyStatus::Limit),
            _ => Err(AppError::InvalidRequest(format!(
                "Unknown key status: {value}"
            ))),
        }
    }
}

/// Represents a CD key record from the database.
///
/// # Database Table
///
/// Maps to the `cd_keys` table. Keys are entered by administrators; their
/// status is driven by the expiry sweep, manual overrides, and accumulated
/// visitor reports.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CdKey {
    /// Unique identifier for this key
    pub id: Uuid,

    /// Program this key unlocks
    pub program_slug: String,

    /// The raw key string (admin surface only, never shown to visitors)
    pub key_value: String,

    /// Current lifecycle status
    pub status: String,

    /// Program version the key applies to
    pub version: Option<String>,

    /// Start of the validity window
    pub valid_from: Option<DateTime<Utc>>,

    /// End of the validity window
    ///
    /// Keys past this instant are moved to `expired` by the sweep.
    /// NULL means the key never expires on its own.
    pub valid_until: Option<DateTime<Utc>>,

    /// Free-text admin notes
    pub notes: Option<String>,

    /// When the key was entered
    pub created_at: DateTime<Utc>,

    /// Last status or metadata change
    pub updated_at: DateTime<Utc>,
}

impl CdKey {
    /// Whether the expiry sweep should move this key to `expired` at `now`.
    ///
    /// Already-expired keys report `false`, which is what makes the sweep
    /// idempotent: a second run over the same data patches nothing.
    pub fn expires_by(&self, now: DateTime<Utc>) -> bool {
        if self.status == KeyStatus::Expired.as_str() {
            return false;
        }

        match self.valid_until {
            Some(until) => until <= now,
            None => false,
        }
    }
}

/// Request to enter a new CD key.
///
/// # JSON Example
///
/// ```json
/// {
///   "program_slug": "photoshop-cc",
///   "key": "ABC-123",
///   "status": "active",
///   "version": "2026",
///   "valid_until": "2026-12-31T00:00:00Z",
///   "notes": "from vendor newsletter"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub program_slug: Option<String>,
    pub key: Option<String>,
    pub status: Option<String>,
    pub version: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Validated key-creation parameters.
#[derive(Debug)]
pub struct CreateKeyParams {
    pub program_slug: String,
    pub key: String,
    pub status: KeyStatus,
    pub version: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl CreateKeyRequest {
    /// Validate required fields; status defaults to `new`.
    pub fn validate(self) -> Result<CreateKeyParams, AppError> {
        let program_slug = require(self.program_slug, "program_slug")?;
        let key = require(self.key, "key")?;
        let status = match self.status {
            Some(value) => KeyStatus::parse(&value)?,
            None => KeyStatus::New,
        };

        Ok(CreateKeyParams {
            program_slug,
            key,
            status,
            version: self.version,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            notes: self.notes,
        })
    }
}

/// Request to manually override a key's status.
#[derive(Debug, Deserialize)]
pub struct UpdateKeyStatusRequest {
    pub status: Option<String>,
}

impl UpdateKeyStatusRequest {
    /// Validate the status value.
    pub fn validate(self) -> Result<KeyStatus, AppError> {
        KeyStatus::parse(&require(self.status, "status")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key_with(status: KeyStatus, valid_until: Option<DateTime<Utc>>) -> CdKey {
        CdKey {
            id: Uuid::new_v4(),
            program_slug: "photoshop-cc".into(),
            key_value: "ABC-123".into(),
            status: status.as_str().into(),
            version: None,
            valid_from: None,
            valid_until,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_round_trips() {
        for value in ["new", "active", "expired", "limit"] {
            assert_eq!(KeyStatus::parse(value).unwrap().as_str(), value);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(matches!(
            KeyStatus::parse("retired"),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn active_key_past_window_expires() {
        let now = Utc::now();
        let key = key_with(KeyStatus::Active, Some(now - Duration::days(1)));
        assert!(key.expires_by(now));
    }

    #[test]
    fn window_boundary_counts_as_expired() {
        let now = Utc::now();
        let key = key_with(KeyStatus::Active, Some(now));
        assert!(key.expires_by(now));
    }

    #[test]
    fn future_window_does_not_expire() {
        let now = Utc::now();
        let key = key_with(KeyStatus::Active, Some(now + Duration::days(1)));
        assert!(!key.expires_by(now));
    }

    #[test]
    fn keys_without_window_never_expire() {
        let key = key_with(KeyStatus::Active, None);
        assert!(!key.expires_by(Utc::now()));
    }

    #[test]
    fn already_expired_keys_are_left_alone() {
        // Idempotence: the second sweep run sees no candidates
        let now = Utc::now();
        let key = key_with(KeyStatus::Expired, Some(now - Duration::days(1)));
        assert!(!key.expires_by(now));
    }

    #[test]
    fn create_defaults_status_to_new() {
        let request = CreateKeyRequest {
            program_slug: Some("photoshop-cc".into()),
            key: Some("ABC-123".into()),
            status: None,
            version: None,
            valid_from: None,
            valid_until: None,
            notes: None,
        };
        assert_eq!(request.validate().unwrap().status, KeyStatus::New);
    }
}
