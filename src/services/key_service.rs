//! CD key service - status lifecycle and the expiry sweep.
//!
//! This service owns every status transition a key can make:
//! - the time-driven expiry sweep (active keys past their validity window
//!   move to `expired`)
//! - administrator manual overrides
//!
//! # Sweep Semantics
//!
//! The sweep is a best-effort batch. Each key is patched independently;
//! one key's failure is counted and logged but never aborts the rest, and
//! the caller receives an aggregate outcome. Re-running the sweep when
//! nothing has newly expired changes nothing.

use std::collections::BTreeSet;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::key::{CdKey, CreateKeyParams, KeyStatus},
};

/// Enter a new CD key.
pub async fn create_key(pool: &DbPool, params: CreateKeyParams) -> Result<CdKey, AppError> {
    let key = sqlx::query_as::<_, CdKey>(
        r#"
        INSERT INTO cd_keys (program_slug, key_value, status, version, valid_from, valid_until, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&params.program_slug)
    .bind(&params.key)
    .bind(params.status.as_str())
    .bind(&params.version)
    .bind(params.valid_from)
    .bind(params.valid_until)
    .bind(&params.notes)
    .fetch_one(pool)
    .await?;

    Ok(key)
}

/// List all keys for a program, newest first.
pub async fn list_program_keys(pool: &DbPool, program_slug: &str) -> Result<Vec<CdKey>, AppError> {
    let keys = sqlx::query_as::<_, CdKey>(
        "SELECT * FROM cd_keys WHERE program_slug = $1 ORDER BY created_at DESC",
    )
    .bind(program_slug)
    .fetch_all(pool)
    .await?;

    Ok(keys)
}

/// Manually override a key's status.
///
/// Returns the updated key, or `KeyNotFound` if the id does not resolve.
pub async fn set_key_status(
    pool: &DbPool,
    key_id: Uuid,
    status: KeyStatus,
) -> Result<CdKey, AppError> {
    let key = sqlx::query_as::<_, CdKey>(
        r#"
        UPDATE cd_keys
        SET status = $1,
            updated_at = NOW()
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(status.as_str())
    .bind(key_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::KeyNotFound)?;

    Ok(key)
}

/// Aggregate outcome of one expiry sweep run.
#[derive(Debug)]
pub struct SweepOutcome {
    /// Keys moved to `expired` in this run
    pub expired: u64,

    /// Keys whose patch failed; they stay candidates for the next run
    pub failed: u64,

    /// Distinct programs whose keys changed, for page revalidation
    pub programs: Vec<String>,
}

/// Expire every key whose validity window has passed.
///
/// # Process
///
/// 1. Fetch candidate keys: `valid_until` at or before now, status not yet
///    `expired` (optionally restricted to one program, always via a bound
///    parameter, never interpolated)
/// 2. Patch each candidate to `expired` in its own statement
/// 3. Count failures and keep going; the batch never aborts part-way
///
/// Idempotent: keys already `expired` are not candidates, so a second run
/// over unchanged data patches nothing.
pub async fn run_expiry_sweep(
    pool: &DbPool,
    program_slug: Option<&str>,
) -> Result<SweepOutcome, AppError> {
    let now = Utc::now();

    let candidates: Vec<CdKey> = match program_slug {
        Some(slug) => {
            sqlx::query_as(
                r#"
                SELECT * FROM cd_keys
                WHERE program_slug = $1
                  AND valid_until IS NOT NULL
                  AND valid_until <= NOW()
                  AND status <> 'expired'
                "#,
            )
            .bind(slug)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as(
                r#"
                SELECT * FROM cd_keys
                WHERE valid_until IS NOT NULL
                  AND valid_until <= NOW()
                  AND status <> 'expired'
                "#,
            )
            .fetch_all(pool)
            .await?
        }
    };

    let mut expired = 0u64;
    let mut failed = 0u64;
    let mut programs = BTreeSet::new();

    for key in candidates {
        if !key.expires_by(now) {
            continue;
        }

        let patch = sqlx::query(
            "UPDATE cd_keys SET status = 'expired', updated_at = NOW() WHERE id = $1",
        )
        .bind(key.id)
        .execute(pool)
        .await;

        match patch {
            Ok(_) => {
                expired += 1;
                programs.insert(key.program_slug);
            }
            Err(e) => {
                // Keep sweeping; this key stays a candidate for the next run
                failed += 1;
                tracing::error!("failed to expire key {}: {e}", key.id);
            }
        }
    }

    Ok(SweepOutcome {
        expired,
        failed,
        programs: programs.into_iter().collect(),
    })
}

/// Try to acquire the per-program sweep gate.
///
/// The gate throttles public sweep triggers to one run per
/// `min_interval_secs` per program, across all server instances. It is a
/// single atomic compare-and-set: insert the slug's row, or advance its
/// timestamp only when the previous run is old enough. Zero rows affected
/// means another instance ran the sweep recently.
pub async fn try_acquire_sweep_gate(
    pool: &DbPool,
    program_slug: &str,
    min_interval_secs: u64,
) -> Result<bool, AppError> {
    let affected = sqlx::query(
        r#"
        INSERT INTO sweep_gates (program_slug, last_run_at)
        VALUES ($1, NOW())
        ON CONFLICT (program_slug)
        DO UPDATE SET last_run_at = NOW()
        WHERE sweep_gates.last_run_at <= NOW() - make_interval(secs => $2)
        "#,
    )
    .bind(program_slug)
    .bind(min_interval_secs as f64)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use sqlx::PgPool;

    async fn insert_key(
        pool: &PgPool,
        program_slug: &str,
        status: &str,
        valid_until: Option<DateTime<Utc>>,
    ) -> Uuid {
        sqlx::query_scalar(
            r#"
            INSERT INTO cd_keys (program_slug, key_value, status, valid_until)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(program_slug)
        .bind("ABC-123")
        .bind(status)
        .bind(valid_until)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn status_of(pool: &PgPool, id: Uuid) -> String {
        sqlx::query_scalar("SELECT status FROM cd_keys WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[ignore = "needs a provisioned Postgres (set DATABASE_URL)"]
    async fn sweep_expires_keys_past_window_and_is_idempotent(pool: PgPool) {
        let yesterday = Utc::now() - Duration::days(1);
        let id = insert_key(&pool, "photoshop-cc", "active", Some(yesterday)).await;

        let outcome = run_expiry_sweep(&pool, None).await.unwrap();
        assert_eq!(outcome.expired, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.programs, vec!["photoshop-cc".to_string()]);
        assert_eq!(status_of(&pool, id).await, "expired");

        // Second run with no time passing: nothing left to patch
        let outcome = run_expiry_sweep(&pool, None).await.unwrap();
        assert_eq!(outcome.expired, 0);
        assert_eq!(status_of(&pool, id).await, "expired");
    }

    #[sqlx::test]
    #[ignore = "needs a provisioned Postgres (set DATABASE_URL)"]
    async fn sweep_leaves_future_and_windowless_keys_alone(pool: PgPool) {
        let tomorrow = Utc::now() + Duration::days(1);
        let future = insert_key(&pool, "vpn-tool", "active", Some(tomorrow)).await;
        let windowless = insert_key(&pool, "vpn-tool", "active", None).await;

        let outcome = run_expiry_sweep(&pool, None).await.unwrap();
        assert_eq!(outcome.expired, 0);
        assert_eq!(status_of(&pool, future).await, "active");
        assert_eq!(status_of(&pool, windowless).await, "active");
    }

    #[sqlx::test]
    #[ignore = "needs a provisioned Postgres (set DATABASE_URL)"]
    async fn program_sweep_only_touches_that_program(pool: PgPool) {
        let yesterday = Utc::now() - Duration::days(1);
        let mine = insert_key(&pool, "photoshop-cc", "active", Some(yesterday)).await;
        let other = insert_key(&pool, "vpn-tool", "active", Some(yesterday)).await;

        let outcome = run_expiry_sweep(&pool, Some("photoshop-cc")).await.unwrap();
        assert_eq!(outcome.expired, 1);
        assert_eq!(status_of(&pool, mine).await, "expired");
        assert_eq!(status_of(&pool, other).await, "active");
    }

    #[sqlx::test]
    #[ignore = "needs a provisioned Postgres (set DATABASE_URL)"]
    async fn sweep_gate_blocks_inside_interval(pool: PgPool) {
        assert!(try_acquire_sweep_gate(&pool, "vpn-tool", 300).await.unwrap());
        // Immediately again: still inside the interval
        assert!(!try_acquire_sweep_gate(&pool, "vpn-tool", 300).await.unwrap());
        // Another program has its own gate
        assert!(try_acquire_sweep_gate(&pool, "photoshop-cc", 300).await.unwrap());
        // A zero interval never throttles
        assert!(try_acquire_sweep_gate(&pool, "vpn-tool", 0).await.unwrap());
    }

    #[sqlx::test]
    #[ignore = "needs a provisioned Postgres (set DATABASE_URL)"]
    async fn manual_override_updates_status(pool: PgPool) {
        let id = insert_key(&pool, "vpn-tool", "new", None).await;

        let key = set_key_status(&pool, id, KeyStatus::Limit).await.unwrap();
        assert_eq!(key.status, "limit");

        let missing = set_key_status(&pool, Uuid::new_v4(), KeyStatus::Active).await;
        assert!(matches!(missing, Err(AppError::KeyNotFound)));
    }
}
