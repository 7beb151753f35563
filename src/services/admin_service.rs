//! Admin key provisioning.
//!
//! Admin keys are normally handed out by an operator inserting a hash into
//! the `admin_keys` table. To make a fresh deployment usable, the server
//! bootstraps one key on first start: if no active key exists, it
//! generates a random key, stores only the hash, and logs the raw value
//! exactly once.

use sha2::{Digest, Sha256};

use crate::{db::DbPool, error::AppError};

/// Generate a raw admin key: 64 hex characters (32 random bytes).
fn generate_key() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// SHA-256 hash of a raw admin key, as stored in the database.
pub fn hash_admin_key(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Create a bootstrap admin key if no active key exists.
///
/// The raw key appears once in the logs and nowhere else; losing it means
/// inserting a new hash by hand.
pub async fn ensure_bootstrap_key(pool: &DbPool) -> Result<(), AppError> {
    let has_active: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM admin_keys WHERE is_active = true)")
            .fetch_one(pool)
            .await?;

    if has_active {
        return Ok(());
    }

    let raw = generate_key();

    sqlx::query("INSERT INTO admin_keys (key_hash, label) VALUES ($1, 'bootstrap')")
        .bind(hash_admin_key(&raw))
        .execute(pool)
        .await?;

    tracing::warn!("no active admin key found; bootstrap key created: {raw}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_hex_and_distinct() {
        let a = generate_key();
        let b = generate_key();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn stored_hash_is_not_the_raw_key() {
        let raw = generate_key();
        let hash = hash_admin_key(&raw);
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, raw);
        // Same key always hashes the same, so lookups work
        assert_eq!(hash, hash_admin_key(&raw));
    }
}
