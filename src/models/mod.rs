//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request/response types exchanged with clients.

/// Admin key authentication model
pub mod admin_key;
/// Analytics event model
pub mod event;
/// CD key model and status lifecycle
pub mod key;
/// Key report model and report event types
pub mod report;

use crate::error::AppError;

/// Pull a required string field out of a request body.
///
/// Inbound payloads deserialize every field as optional so that a missing
/// or blank field surfaces as a typed `MissingField` error naming the
/// field, instead of a framework-level deserialization failure.
pub(crate) fn require(value: Option<String>, field: &'static str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AppError::MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_missing_and_blank() {
        assert!(matches!(
            require(None, "program_slug"),
            Err(AppError::MissingField("program_slug"))
        ));
        assert!(matches!(
            require(Some("   ".into()), "key"),
            Err(AppError::MissingField("key"))
        ));
    }

    #[test]
    fn require_trims_present_values() {
        assert_eq!(require(Some(" vpn-tool ".into()), "program_slug").unwrap(), "vpn-tool");
    }
}
