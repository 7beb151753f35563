//! Key report service - deduplication and renewal.
//!
//! This service decides, for an inbound report, whether it duplicates an
//! existing live report from the same visitor, admits creation when it
//! does not, and validates ownership before a renewal may change an
//! existing report's event type.
//!
//! # Deduplication Key
//!
//! Reports are keyed by (visitor_hash, program_slug, key_hash). The
//! application looks the tuple up before creating, and the table carries a
//! unique index over the tuple, so a race between two near-simultaneous
//! submissions resolves to a single live report: the loser's insert trips
//! the index and is answered with the winner's record.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    fingerprint,
    models::report::{
        CreateReportParams, DuplicateCheckParams, DuplicateCheckResponse, KeyReport, ReportSummary,
    },
};

/// Look up the live report for a (visitor, program, key) tuple.
async fn find_by_tuple(
    pool: &DbPool,
    visitor_hash: &str,
    program_slug: &str,
    key_hash: &str,
) -> Result<Option<KeyReport>, AppError> {
    let report = sqlx::query_as::<_, KeyReport>(
        r#"
        SELECT * FROM key_reports
        WHERE visitor_hash = $1 AND program_slug = $2 AND key_hash = $3
        "#,
    )
    .bind(visitor_hash)
    .bind(program_slug)
    .bind(key_hash)
    .fetch_optional(pool)
    .await?;

    Ok(report)
}

/// Check whether the visitor already reported this key.
///
/// # Process
///
/// 1. Hash the raw key (one-way, unsalted)
/// 2. Look up the (visitor, program, key) tuple
/// 3. Report the existing record, redacted, if one exists
///
/// Read-only: the check never creates a report. A caller that receives
/// `is_duplicate = false` submits the actual report through the create
/// operation, which re-checks the tuple itself.
pub async fn check_duplicate(
    pool: &DbPool,
    visitor_hash: &str,
    params: DuplicateCheckParams,
) -> Result<DuplicateCheckResponse, AppError> {
    let key_hash = fingerprint::hash_key(&params.key);

    let existing = find_by_tuple(pool, visitor_hash, &params.program_slug, &key_hash).await?;

    Ok(DuplicateCheckResponse {
        is_duplicate: existing.is_some(),
        existing_report: existing.map(ReportSummary::from),
    })
}

/// Outcome of a report submission.
pub enum CreateOutcome {
    /// A new report was stored
    Created(KeyReport),
    /// The tuple already had a live report; nothing was stored
    Duplicate(KeyReport),
}

/// Submit a new key report for the visitor.
///
/// # Process
///
/// 1. Hash and mask the raw key
/// 2. Re-check the tuple (lookup-before-create)
/// 3. Insert with a server-assigned id
/// 4. If a concurrent submission won the race and the insert trips the
///    tuple's unique index, answer with the winner's record instead of
///    surfacing a store failure
pub async fn create_report(
    pool: &DbPool,
    visitor_hash: &str,
    params: CreateReportParams,
) -> Result<CreateOutcome, AppError> {
    let key_hash = fingerprint::hash_key(&params.key);
    let key_mask = fingerprint::key_mask(&params.key);

    // Lookup-before-create: the common duplicate path costs no write
    if let Some(existing) =
        find_by_tuple(pool, visitor_hash, &params.program_slug, &key_hash).await?
    {
        return Ok(CreateOutcome::Duplicate(existing));
    }

    let inserted = sqlx::query_as::<_, KeyReport>(
        r#"
        INSERT INTO key_reports (program_slug, key_hash, key_mask, event_type, visitor_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&params.program_slug)
    .bind(&key_hash)
    .bind(&key_mask)
    .bind(params.event_type.as_str())
    .bind(visitor_hash)
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(report) => Ok(CreateOutcome::Created(report)),
        // Race with a concurrent create for the same tuple: the unique
        // index rejected our insert, so the winner's record is live
        Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
            let existing = find_by_tuple(pool, visitor_hash, &params.program_slug, &key_hash)
                .await?
                .ok_or(AppError::NotFoundOrAccessDenied)?;
            Ok(CreateOutcome::Duplicate(existing))
        }
        Err(e) => Err(e.into()),
    }
}

/// Change the event type of an existing report.
///
/// # Ownership
///
/// The update is keyed by (id, visitor_hash) in a single statement. Zero
/// rows affected means the id does not resolve OR the caller is not the
/// report's original visitor; the two cases are answered identically so a
/// non-owner cannot learn whether a report id exists.
///
/// # Effect
///
/// Sets the event type and refreshes the timestamp to now. No other
/// fields change.
pub async fn renew_report(
    pool: &DbPool,
    visitor_hash: &str,
    report_id: Uuid,
    new_event_type: &str,
) -> Result<KeyReport, AppError> {
    let updated = sqlx::query_as::<_, KeyReport>(
        r#"
        UPDATE key_reports
        SET event_type = $1,
            created_at = NOW()
        WHERE id = $2 AND visitor_hash = $3
        RETURNING *
        "#,
    )
    .bind(new_event_type)
    .bind(report_id)
    .bind(visitor_hash)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFoundOrAccessDenied)?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::ReportEventType;
    use sqlx::PgPool;

    fn check_params(program_slug: &str, key: &str) -> DuplicateCheckParams {
        DuplicateCheckParams {
            program_slug: program_slug.into(),
            key: key.into(),
        }
    }

    fn create_params(program_slug: &str, key: &str, event_type: ReportEventType) -> CreateReportParams {
        CreateReportParams {
            program_slug: program_slug.into(),
            key: key.into(),
            event_type,
        }
    }

    #[sqlx::test]
    #[ignore = "needs a provisioned Postgres (set DATABASE_URL)"]
    async fn duplicate_check_without_create_stays_false(pool: PgPool) {
        let visitor = fingerprint::fingerprint(Some("1.2.3.4"), "test-salt");

        for _ in 0..2 {
            let outcome = check_duplicate(&pool, &visitor, check_params("vpn-tool", "XYZ"))
                .await
                .unwrap();
            // The check is read-only: repeating it never creates a report
            assert!(!outcome.is_duplicate);
            assert!(outcome.existing_report.is_none());
        }
    }

    #[sqlx::test]
    #[ignore = "needs a provisioned Postgres (set DATABASE_URL)"]
    async fn create_then_duplicate_check_reports_existing(pool: PgPool) {
        let visitor = fingerprint::fingerprint(Some("1.2.3.4"), "test-salt");

        let outcome = create_report(
            &pool,
            &visitor,
            create_params("vpn-tool", "XYZ", ReportEventType::Working),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, CreateOutcome::Created(_)));

        let check = check_duplicate(&pool, &visitor, check_params("vpn-tool", "XYZ"))
            .await
            .unwrap();
        assert!(check.is_duplicate);
        let existing = check.existing_report.unwrap();
        assert_eq!(existing.event_type, "report_key_working");

        // A different visitor reporting the same key is not a duplicate
        let other = fingerprint::fingerprint(Some("5.6.7.8"), "test-salt");
        let check = check_duplicate(&pool, &other, check_params("vpn-tool", "XYZ"))
            .await
            .unwrap();
        assert!(!check.is_duplicate);
    }

    #[sqlx::test]
    #[ignore = "needs a provisioned Postgres (set DATABASE_URL)"]
    async fn repeated_create_is_answered_with_existing_report(pool: PgPool) {
        let visitor = fingerprint::fingerprint(Some("1.2.3.4"), "test-salt");

        let first = create_report(
            &pool,
            &visitor,
            create_params("vpn-tool", "XYZ", ReportEventType::Working),
        )
        .await
        .unwrap();
        let CreateOutcome::Created(first) = first else {
            panic!("first submission should create");
        };

        let second = create_report(
            &pool,
            &visitor,
            create_params("vpn-tool", "XYZ", ReportEventType::Expired),
        )
        .await
        .unwrap();
        let CreateOutcome::Duplicate(existing) = second else {
            panic!("second submission should be a duplicate");
        };
        assert_eq!(existing.id, first.id);
        // The duplicate path stores nothing: the original event type stands
        assert_eq!(existing.event_type, "report_key_working");
    }

    #[sqlx::test]
    #[ignore = "needs a provisioned Postgres (set DATABASE_URL)"]
    async fn renew_by_non_owner_is_not_found(pool: PgPool) {
        let owner = fingerprint::fingerprint(Some("1.2.3.4"), "test-salt");
        let stranger = fingerprint::fingerprint(Some("9.9.9.9"), "test-salt");

        let CreateOutcome::Created(report) = create_report(
            &pool,
            &owner,
            create_params("vpn-tool", "XYZ", ReportEventType::Working),
        )
        .await
        .unwrap() else {
            panic!("submission should create");
        };

        let result = renew_report(&pool, &stranger, report.id, "report_key_expired").await;
        assert!(matches!(result, Err(AppError::NotFoundOrAccessDenied)));

        // An id that resolves to nothing gets the identical answer
        let result = renew_report(&pool, &owner, Uuid::new_v4(), "report_key_expired").await;
        assert!(matches!(result, Err(AppError::NotFoundOrAccessDenied)));
    }

    #[sqlx::test]
    #[ignore = "needs a provisioned Postgres (set DATABASE_URL)"]
    async fn renew_updates_event_type_and_advances_timestamp(pool: PgPool) {
        let visitor = fingerprint::fingerprint(Some("1.2.3.4"), "test-salt");

        let CreateOutcome::Created(report) = create_report(
            &pool,
            &visitor,
            create_params("vpn-tool", "XYZ", ReportEventType::Working),
        )
        .await
        .unwrap() else {
            panic!("submission should create");
        };

        let updated = renew_report(&pool, &visitor, report.id, "report_key_expired")
            .await
            .unwrap();

        assert_eq!(updated.id, report.id);
        assert_eq!(updated.event_type, "report_key_expired");
        assert!(updated.created_at >= report.created_at);
        // Nothing else changed
        assert_eq!(updated.key_hash, report.key_hash);
        assert_eq!(updated.visitor_hash, report.visitor_hash);
    }
}
