//! Analytics event data models.
//!
//! The site records page views and lightweight interaction events so the
//! operators can see which programs and keys get traffic. Events carry the
//! visitor fingerprint (never the raw address) so unique-visitor counts
//! stay possible without storing identifying data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::require;

/// Interaction events the site records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsEventType {
    /// A program or key page was rendered
    PageView,
    /// A visitor copied a key to the clipboard
    KeyCopy,
    /// A visitor followed an outbound social link
    SocialClick,
}

impl AnalyticsEventType {
    /// Wire representation, as stored in the `event_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            AnalyticsEventType::PageView => "page_view",
            AnalyticsEventType::KeyCopy => "key_copy",
            AnalyticsEventType::SocialClick => "social_click",
        }
    }

    /// Parse a wire value.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "page_view" => Ok(AnalyticsEventType::PageView),
            "key_copy" => Ok(AnalyticsEventType::KeyCopy),
            "social_click" => Ok(AnalyticsEventType::SocialClick),
            _ => Err(AppError::InvalidEventType),
        }
    }
}

/// Represents an analytics event record from the database.
///
/// Maps to the `analytics_events` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub event_type: String,
    pub program_slug: Option<String>,
    pub social: Option<String>,
    pub path: Option<String>,
    pub url: Option<String>,
    pub visitor_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Request to record an analytics event.
///
/// # JSON Example
///
/// ```json
/// {
///   "event_type": "social_click",
///   "program_slug": "vpn-tool",
///   "social": "twitter",
///   "url": "https://twitter.com/example"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct RecordEventRequest {
    pub event_type: Option<String>,
    pub program_slug: Option<String>,
    pub social: Option<String>,
    pub path: Option<String>,
    pub url: Option<String>,
}

/// Validated analytics event parameters.
#[derive(Debug)]
pub struct RecordEventParams {
    pub event_type: AnalyticsEventType,
    pub program_slug: Option<String>,
    pub social: Option<String>,
    pub path: Option<String>,
    pub url: Option<String>,
}

impl RecordEventRequest {
    /// Validate the event type and any outbound link target.
    ///
    /// # Rules
    ///
    /// - `event_type` is required and must be in the enumerated set
    /// - `social_click` events must name the social network
    /// - a supplied `url` must parse as an absolute http(s) URL
    pub fn validate(self) -> Result<RecordEventParams, AppError> {
        let event_type = AnalyticsEventType::parse(&require(self.event_type, "event_type")?)?;

        if event_type == AnalyticsEventType::SocialClick
            && self.social.as_deref().is_none_or(|s| s.trim().is_empty())
        {
            return Err(AppError::MissingField("social"));
        }

        if let Some(ref raw) = self.url {
            let parsed = url::Url::parse(raw)
                .map_err(|_| AppError::InvalidRequest("Invalid URL format".to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppError::InvalidRequest(
                    "URL must use HTTP or HTTPS".to_string(),
                ));
            }
        }

        Ok(RecordEventParams {
            event_type,
            program_slug: self.program_slug,
            social: self.social,
            path: self.path,
            url: self.url,
        })
    }
}

/// Event representation returned to clients.
///
/// The visitor hash stays server-side, same as for report summaries.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub event_type: String,
    pub program_slug: Option<String>,
    pub social: Option<String>,
    pub path: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AnalyticsEvent> for EventResponse {
    fn from(event: AnalyticsEvent) -> Self {
        Self {
            id: event.id,
            event_type: event.event_type,
            program_slug: event.program_slug,
            social: event.social,
            path: event.path,
            url: event.url,
            created_at: event.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(event_type: &str) -> RecordEventRequest {
        RecordEventRequest {
            event_type: Some(event_type.into()),
            program_slug: Some("vpn-tool".into()),
            social: None,
            path: None,
            url: None,
        }
    }

    #[test]
    fn event_type_round_trips() {
        for value in ["page_view", "key_copy", "social_click"] {
            assert_eq!(AnalyticsEventType::parse(value).unwrap().as_str(), value);
        }
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        assert!(matches!(
            AnalyticsEventType::parse("mouse_move"),
            Err(AppError::InvalidEventType)
        ));
    }

    #[test]
    fn social_click_requires_network_name() {
        assert!(matches!(
            request("social_click").validate(),
            Err(AppError::MissingField("social"))
        ));
    }

    #[test]
    fn page_view_needs_no_social() {
        assert!(request("page_view").validate().is_ok());
    }

    #[test]
    fn outbound_url_must_be_http() {
        let mut req = request("page_view");
        req.url = Some("ftp://example.com/file".into());
        assert!(matches!(req.validate(), Err(AppError::InvalidRequest(_))));

        let mut req = request("page_view");
        req.url = Some("not a url".into());
        assert!(matches!(req.validate(), Err(AppError::InvalidRequest(_))));

        let mut req = request("page_view");
        req.url = Some("https://example.com/page".into());
        assert!(req.validate().is_ok());
    }
}
