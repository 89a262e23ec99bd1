use crate::error::{Result, SakegramError};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum PostStatus {
    Scheduled,
    Posted,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Scheduled => "scheduled",
            PostStatus::Posted => "posted",
            PostStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheduled Instagram image post, as stored in `db.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Post {
    /// Creation time in epoch milliseconds, unique per store.
    pub id: i64,
    /// Public `https://` URL or a path relative to the server root (`uploads/...`).
    pub image_path: String,
    #[serde(default)]
    pub caption: String,
    pub schedule_time: DateTime<Utc>,
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "deserialize_error",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
}

impl Post {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == PostStatus::Scheduled && self.schedule_time <= now
    }

    /// Ordering key for pruning. Records written before `createdAt`
    /// existed fall back to their id, which is also a millisecond timestamp.
    pub fn age_key(&self) -> i64 {
        self.created_at
            .map(|t| t.timestamp_millis())
            .unwrap_or(self.id)
    }

    pub fn apply_outcome(&mut self, outcome: &PublishOutcome, at: DateTime<Utc>) {
        self.posted_at = Some(at);
        match outcome {
            PublishOutcome::Published { media_id } => {
                self.status = PostStatus::Posted;
                self.error = None;
                self.media_id = Some(media_id.clone());
            }
            PublishOutcome::Failed { error } => {
                self.status = PostStatus::Failed;
                self.error = Some(error.clone());
            }
        }
    }
}

/// Older records may hold the raw Graph API error body instead of a message.
fn deserialize_error<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(error_message))
}

/// `{"error": {"message": ..}}` or `{"message": ..}` -> the message; any
/// other non-null value -> its compact JSON.
fn error_message(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Object(ref map) => {
            let message = map
                .get("error")
                .and_then(|e| e.get("message"))
                .or_else(|| map.get("message"))
                .and_then(Value::as_str)
                .map(String::from);
            Some(message.unwrap_or_else(|| value.to_string()))
        }
        other => Some(other.to_string()),
    }
}

/// Input for [`crate::store::PostStore::insert`].
#[derive(Debug, Clone)]
pub struct NewPost {
    pub image_path: String,
    pub caption: String,
    pub schedule_time: DateTime<Utc>,
}

/// Result of one publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { media_id: String },
    Failed { error: String },
}

impl PublishOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

/// Parse a schedule time sent by a client.
///
/// RFC 3339 is the normal form; a bare `YYYY-MM-DDTHH:MM[:SS]` is taken as UTC.
pub fn parse_schedule_time(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SakegramError::MissingField("scheduleTime".into()));
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(SakegramError::InvalidRequest(format!(
        "scheduleTime is not a valid date: {}",
        raw
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Post {
        Post {
            id: 1_700_000_000_000,
            image_path: "https://res.cloudinary.com/demo/a.jpg".into(),
            caption: "新酒".into(),
            schedule_time: Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap(),
            status: PostStatus::Scheduled,
            created_at: None,
            posted_at: None,
            error: None,
            media_id: None,
        }
    }

    #[test]
    fn test_post_wire_format_is_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["imagePath"], "https://res.cloudinary.com/demo/a.jpg");
        assert_eq!(json["status"], "scheduled");
        assert!(json["scheduleTime"].as_str().unwrap().starts_with("2026-01-10T09:00:00"));
        assert!(json.get("error").is_none());
        assert!(json.get("createdAt").is_none());
    }

    #[test]
    fn test_legacy_record_without_created_at() {
        let post: Post = serde_json::from_str(
            r#"{"id": 1699999999999, "imagePath": "uploads/1.jpg", "scheduleTime": "2024-05-01T00:00:00.000Z", "status": "posted", "postedAt": "2024-05-01T00:01:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(post.caption, "");
        assert_eq!(post.age_key(), 1699999999999);
        assert_eq!(post.status, PostStatus::Posted);
    }

    #[test]
    fn test_legacy_error_object_becomes_message() {
        let post: Post = serde_json::from_str(
            r#"{"id": 1700000000000, "imagePath": "uploads/1.jpg", "scheduleTime": "2024-05-01T00:00:00.000Z", "status": "failed",
                "error": {"error": {"message": "Invalid OAuth access token.", "type": "OAuthException", "code": 190}}}"#,
        )
        .unwrap();
        assert_eq!(post.error.as_deref(), Some("Invalid OAuth access token."));

        let post: Post = serde_json::from_str(
            r#"{"id": 1, "imagePath": "uploads/1.jpg", "scheduleTime": "2024-05-01T00:00:00Z", "status": "failed", "error": {"code": 2}}"#,
        )
        .unwrap();
        assert_eq!(post.error.as_deref(), Some(r#"{"code":2}"#));

        let post: Post = serde_json::from_str(
            r#"{"id": 1, "imagePath": "uploads/1.jpg", "scheduleTime": "2024-05-01T00:00:00Z", "status": "scheduled", "error": null}"#,
        )
        .unwrap();
        assert_eq!(post.error, None);
    }

    #[test]
    fn test_is_due() {
        let post = sample();
        let before = Utc.with_ymd_and_hms(2026, 1, 10, 8, 59, 59).unwrap();
        assert!(!post.is_due(before));
        assert!(post.is_due(post.schedule_time));

        let mut failed = sample();
        failed.status = PostStatus::Failed;
        assert!(!failed.is_due(post.schedule_time));
    }

    #[test]
    fn test_apply_outcome() {
        let at = Utc.with_ymd_and_hms(2026, 1, 10, 9, 1, 0).unwrap();
        let mut post = sample();
        post.apply_outcome(
            &PublishOutcome::Failed {
                error: "ACCESS_TOKEN is missing".into(),
            },
            at,
        );
        assert_eq!(post.status, PostStatus::Failed);
        assert_eq!(post.error.as_deref(), Some("ACCESS_TOKEN is missing"));

        post.apply_outcome(
            &PublishOutcome::Published {
                media_id: "1790".into(),
            },
            at,
        );
        assert_eq!(post.status, PostStatus::Posted);
        assert_eq!(post.error, None);
        assert_eq!(post.media_id.as_deref(), Some("1790"));
        assert_eq!(post.posted_at, Some(at));
    }

    #[test]
    fn test_parse_schedule_time() {
        let t = parse_schedule_time("2026-01-10T18:00:00+09:00").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap());

        let t = parse_schedule_time("2026-01-10T09:00").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap());

        assert!(matches!(
            parse_schedule_time(""),
            Err(SakegramError::MissingField(_))
        ));
        assert!(matches!(
            parse_schedule_time("next tuesday"),
            Err(SakegramError::InvalidRequest(_))
        ));
    }
}
