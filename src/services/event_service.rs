//! Analytics event service - recording and in-memory aggregation.
//!
//! Events are appended as they happen; the admin summary fetches the raw
//! rows and groups counts by event type, program, and social network in
//! memory. Volumes here are small (a content site, not an ad network), so
//! a HashMap pass beats maintaining materialized counters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db::DbPool,
    error::AppError,
    models::event::{AnalyticsEvent, RecordEventParams},
};

/// Store one analytics event.
pub async fn record_event(
    pool: &DbPool,
    visitor_hash: &str,
    params: RecordEventParams,
) -> Result<AnalyticsEvent, AppError> {
    let event = sqlx::query_as::<_, AnalyticsEvent>(
        r#"
        INSERT INTO analytics_events (event_type, program_slug, social, path, url, visitor_hash)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(params.event_type.as_str())
    .bind(&params.program_slug)
    .bind(&params.social)
    .bind(&params.path)
    .bind(&params.url)
    .bind(visitor_hash)
    .fetch_one(pool)
    .await?;

    Ok(event)
}

/// Grouped event counts for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct EventSummary {
    pub total: u64,
    pub by_event: BTreeMap<String, u64>,
    pub by_program: BTreeMap<String, u64>,
    pub by_social: BTreeMap<String, u64>,
}

/// One row of the summary query: just the grouping dimensions.
#[derive(Debug, sqlx::FromRow)]
pub struct EventDimensions {
    pub event_type: String,
    pub program_slug: Option<String>,
    pub social: Option<String>,
}

/// Group event counts in memory.
///
/// Events without a program or social dimension simply don't contribute to
/// that grouping; the total counts every event once.
pub fn summarize(rows: &[EventDimensions]) -> EventSummary {
    let mut by_event: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_program: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_social: BTreeMap<String, u64> = BTreeMap::new();

    for row in rows {
        *by_event.entry(row.event_type.clone()).or_default() += 1;

        if let Some(ref program) = row.program_slug {
            *by_program.entry(program.clone()).or_default() += 1;
        }

        if let Some(ref social) = row.social {
            *by_social.entry(social.clone()).or_default() += 1;
        }
    }

    EventSummary {
        total: rows.len() as u64,
        by_event,
        by_program,
        by_social,
    }
}

/// Fetch events since `since` (or all of them) and aggregate.
pub async fn fetch_summary(
    pool: &DbPool,
    since: Option<DateTime<Utc>>,
) -> Result<EventSummary, AppError> {
    let rows: Vec<EventDimensions> = match since {
        Some(since) => {
            sqlx::query_as(
                "SELECT event_type, program_slug, social FROM analytics_events WHERE created_at >= $1",
            )
            .bind(since)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT event_type, program_slug, social FROM analytics_events")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(summarize(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(event_type: &str, program: Option<&str>, social: Option<&str>) -> EventDimensions {
        EventDimensions {
            event_type: event_type.into(),
            program_slug: program.map(Into::into),
            social: social.map(Into::into),
        }
    }

    #[test]
    fn summarize_groups_by_all_dimensions() {
        let rows = vec![
            row("page_view", Some("vpn-tool"), None),
            row("page_view", Some("vpn-tool"), None),
            row("page_view", Some("photoshop-cc"), None),
            row("key_copy", Some("vpn-tool"), None),
            row("social_click", None, Some("twitter")),
            row("social_click", None, Some("twitter")),
            row("social_click", None, Some("reddit")),
        ];

        let summary = summarize(&rows);

        assert_eq!(summary.total, 7);
        assert_eq!(summary.by_event["page_view"], 3);
        assert_eq!(summary.by_event["key_copy"], 1);
        assert_eq!(summary.by_event["social_click"], 3);
        assert_eq!(summary.by_program["vpn-tool"], 3);
        assert_eq!(summary.by_program["photoshop-cc"], 1);
        assert_eq!(summary.by_social["twitter"], 2);
        assert_eq!(summary.by_social["reddit"], 1);
    }

    #[test]
    fn summarize_handles_empty_input() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert!(summary.by_event.is_empty());
        assert!(summary.by_program.is_empty());
        assert!(summary.by_social.is_empty());
    }
}
