//! Visitor fingerprinting and key hashing.
//!
//! Reports must be deduplicated per visitor without storing anything that
//! identifies the visitor. The fingerprint is a SHA-256 digest over the
//! visitor's source address concatenated with a server-side salt; only the
//! hex digest ever reaches the database.
//!
//! Key hashing uses the same digest but no salt, so two visitors reporting
//! the same literal key produce the same hash. That allows per-key
//! aggregation without storing submitted keys in plaintext.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Header carrying the original client address when behind a proxy.
const FORWARDED_FOR: &str = "x-forwarded-for";

/// Extract the visitor's source address from request headers.
///
/// Takes the first comma-separated token of `X-Forwarded-For`, trimmed.
/// An absent header is not an error (direct connections have no proxy
/// chain); it yields `None` and the fingerprint falls back to hashing the
/// empty string.
///
/// # Errors
///
/// A header that is present but not valid visible ASCII means the source
/// address cannot be determined, which makes deduplication meaningless.
/// That case is `FingerprintUnavailable` and callers reject the request.
pub fn source_address(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(FORWARDED_FOR) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| AppError::FingerprintUnavailable)?;

    let first = value.split(',').next().unwrap_or("").trim();

    Ok(Some(first.to_string()))
}

/// Compute the pseudonymous visitor fingerprint.
///
/// SHA-256 over `address + salt`, hex encoded. Deterministic for a given
/// (address, salt) pair; 64 lowercase hex characters regardless of input.
pub fn fingerprint(source_address: Option<&str>, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_address.unwrap_or("").as_bytes());
    hasher.update(salt.as_bytes());

    hex::encode(hasher.finalize())
}

/// Fingerprint the visitor behind a request.
///
/// Convenience wrapper combining [`source_address`] and [`fingerprint`].
pub fn visitor_hash(headers: &HeaderMap, salt: &str) -> Result<String, AppError> {
    let address = source_address(headers)?;

    Ok(fingerprint(address.as_deref(), salt))
}

/// One-way hash of a raw CD key.
///
/// No salt: the hash is a global identity for the literal key string.
pub fn hash_key(raw_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_key.as_bytes());

    hex::encode(hasher.finalize())
}

/// Redact a raw key for display.
///
/// Keeps the first and last four characters with the middle elided, so a
/// report can be recognized by a human without exposing the full key.
/// Short keys are fully redacted.
pub fn key_mask(raw_key: &str) -> String {
    let chars: Vec<char> = raw_key.chars().collect();

    if chars.len() <= 8 {
        return "****".to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();

    format!("{head}****{tail}")
}
