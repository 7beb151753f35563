//! Key report data models and API request/response types.
//!
//! This module defines:
//! - `KeyReport`: Database entity representing a visitor's report about a key
//! - `ReportEventType`: The enumerated set of report assertions
//! - Request types for duplicate-check, create, and renew operations
//! - `ReportSummary`: Redacted response body returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::require;

/// What a visitor asserts about a CD key.
///
/// Stored as text in the database; parsed at the system boundary so that
/// anything outside this set is rejected before it reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportEventType {
    /// The key activated the program successfully
    Working,
    /// The key is past its validity window
    Expired,
    /// The key hit its activation limit
    LimitReached,
}

impl ReportEventType {
    /// Wire representation, as stored in the `event_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            ReportEventType::Working => "report_key_working",
            ReportEventType::Expired => "report_key_expired",
            ReportEventType::LimitReached => "report_key_limit_reached",
        }
    }

    /// Parse a wire value. Anything outside the set is `InvalidEventType`.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "report_key_working" => Ok(ReportEventType::Working),
            "report_key_expired" => Ok(ReportEventType::Expired),
            "report_key_limit_reached" => Ok(ReportEventType::LimitReached),
            _ => Err(AppError::InvalidEventType),
        }
    }
}

/// Represents a key report record from the database.
///
/// # Database Table
///
/// Maps to the `key_reports` table. Each report:
/// - Belongs to one (visitor_hash, program_slug, key_hash) tuple
/// - Never stores the raw key or the raw visitor address
/// - Is updated in place on renewal (event type + timestamp)
///
/// The tuple carries a unique index, so at most one live report can exist
/// per visitor, program and key even under concurrent submissions.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct KeyReport {
    /// Unique identifier for this report
    pub id: Uuid,

    /// Program the reported key belongs to
    pub program_slug: String,

    /// One-way hash of the raw key (64 hex characters)
    pub key_hash: String,

    /// Redacted key identifier for display
    pub key_mask: String,

    /// One of the three report event types
    pub event_type: String,

    /// Pseudonymous visitor fingerprint (64 hex characters)
    pub visitor_hash: String,

    /// When the report was created, refreshed on renewal
    pub created_at: DateTime<Utc>,
}

/// Request to check whether the caller already reported a key.
///
/// # JSON Example
///
/// ```json
/// {
///   "program_slug": "vpn-tool",
///   "key": "XYZ-123"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct DuplicateCheckRequest {
    pub program_slug: Option<String>,
    pub key: Option<String>,
}

/// Validated duplicate-check parameters.
#[derive(Debug)]
pub struct DuplicateCheckParams {
    pub program_slug: String,
    pub key: String,
}

impl DuplicateCheckRequest {
    /// Validate required fields into typed parameters.
    pub fn validate(self) -> Result<DuplicateCheckParams, AppError> {
        Ok(DuplicateCheckParams {
            program_slug: require(self.program_slug, "program_slug")?,
            key: require(self.key, "key")?,
        })
    }
}

/// Request to submit a new key report.
///
/// # JSON Example
///
/// ```json
/// {
///   "program_slug": "vpn-tool",
///   "key": "XYZ-123",
///   "event_type": "report_key_working"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub program_slug: Option<String>,
    pub key: Option<String>,
    pub event_type: Option<String>,
}

/// Validated create parameters.
#[derive(Debug)]
pub struct CreateReportParams {
    pub program_slug: String,
    pub key: String,
    pub event_type: ReportEventType,
}

impl CreateReportRequest {
    /// Validate required fields and the event type.
    pub fn validate(self) -> Result<CreateReportParams, AppError> {
        let program_slug = require(self.program_slug, "program_slug")?;
        let key = require(self.key, "key")?;
        let event_type = ReportEventType::parse(&require(self.event_type, "event_type")?)?;

        Ok(CreateReportParams {
            program_slug,
            key,
            event_type,
        })
    }
}

/// Request to change the event type of an existing report.
///
/// # JSON Example
///
/// ```json
/// {
///   "report_id": "550e8400-e29b-41d4-a716-446655440000",
///   "new_event_type": "report_key_expired",
///   "program_slug": "vpn-tool",
///   "key": "XYZ-123"
/// }
/// ```
///
/// # Validation
///
/// - All four fields are required
/// - `new_event_type` must be one of the three report event types
/// - Only the report's original visitor may renew it
#[derive(Debug, Deserialize)]
pub struct RenewReportRequest {
    pub report_id: Option<String>,
    pub new_event_type: Option<String>,
    pub program_slug: Option<String>,
    pub key: Option<String>,
}

/// Validated renew parameters.
#[derive(Debug)]
pub struct RenewReportParams {
    pub report_id: Uuid,
    pub new_event_type: ReportEventType,
    pub program_slug: String,
    pub key: String,
}

impl RenewReportRequest {
    /// Validate required fields, the event type, and the report id.
    ///
    /// The event type is checked before the id so a bogus event type is
    /// reported as such even when the id is also unusable. An id that is
    /// not a UUID can never resolve to a report, which is the same outcome
    /// as an unknown id: `NotFoundOrAccessDenied`.
    pub fn validate(self) -> Result<RenewReportParams, AppError> {
        let report_id = require(self.report_id, "report_id")?;
        let new_event_type = ReportEventType::parse(&require(self.new_event_type, "new_event_type")?)?;
        let program_slug = require(self.program_slug, "program_slug")?;
        let key = require(self.key, "key")?;

        let report_id =
            Uuid::parse_str(&report_id).map_err(|_| AppError::NotFoundOrAccessDenied)?;

        Ok(RenewReportParams {
            report_id,
            new_event_type,
            program_slug,
            key,
        })
    }
}

/// Redacted report representation returned to clients.
///
/// The visitor hash never leaves the server; everything else about the
/// report is safe to show to its owner.
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub id: Uuid,
    pub event_type: String,
    pub program_slug: String,
    pub key_hash: String,
    pub key_mask: String,
    pub created_at: DateTime<Utc>,
}

impl From<KeyReport> for ReportSummary {
    fn from(report: KeyReport) -> Self {
        Self {
            id: report.id,
            event_type: report.event_type,
            program_slug: report.program_slug,
            key_hash: report.key_hash,
            key_mask: report.key_mask,
            created_at: report.created_at,
        }
    }
}

/// Response for the duplicate-check operation.
#[derive(Debug, Serialize)]
pub struct DuplicateCheckResponse {
    pub is_duplicate: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_report: Option<ReportSummary>,
}

/// Response for the renew operation.
#[derive(Debug, Serialize)]
pub struct RenewReportResponse {
    pub updated_report: ReportSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_round_trips() {
        for value in [
            "report_key_working",
            "report_key_expired",
            "report_key_limit_reached",
        ] {
            assert_eq!(ReportEventType::parse(value).unwrap().as_str(), value);
        }
    }

    #[test]
    fn bogus_event_type_is_rejected() {
        assert!(matches!(
            ReportEventType::parse("bogus"),
            Err(AppError::InvalidEventType)
        ));
        assert!(matches!(
            ReportEventType::parse(""),
            Err(AppError::InvalidEventType)
        ));
    }

    #[test]
    fn duplicate_check_requires_both_fields() {
        let request = DuplicateCheckRequest {
            program_slug: None,
            key: Some("XYZ".into()),
        };
        assert!(matches!(
            request.validate(),
            Err(AppError::MissingField("program_slug"))
        ));

        let request = DuplicateCheckRequest {
            program_slug: Some("vpn-tool".into()),
            key: None,
        };
        assert!(matches!(request.validate(), Err(AppError::MissingField("key"))));
    }

    #[test]
    fn renew_rejects_bogus_event_type_before_id_parsing() {
        let request = RenewReportRequest {
            report_id: Some("not-a-uuid".into()),
            new_event_type: Some("bogus".into()),
            program_slug: Some("vpn-tool".into()),
            key: Some("XYZ".into()),
        };
        assert!(matches!(request.validate(), Err(AppError::InvalidEventType)));
    }

    #[test]
    fn renew_conflates_unparseable_id_with_not_found() {
        let request = RenewReportRequest {
            report_id: Some("not-a-uuid".into()),
            new_event_type: Some("report_key_working".into()),
            program_slug: Some("vpn-tool".into()),
            key: Some("XYZ".into()),
        };
        assert!(matches!(
            request.validate(),
            Err(AppError::NotFoundOrAccessDenied)
        ));
    }

    #[test]
    fn summary_redacts_visitor_hash() {
        let report = KeyReport {
            id: Uuid::new_v4(),
            program_slug: "vpn-tool".into(),
            key_hash: "ab".repeat(32),
            key_mask: "XYZ-****-123".into(),
            event_type: "report_key_working".into(),
            visitor_hash: "cd".repeat(32),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(ReportSummary::from(report)).unwrap();
        assert!(json.get("visitor_hash").is_none());
        assert_eq!(json["event_type"], "report_key_working");
    }
}
