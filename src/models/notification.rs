use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{millis_to_datetime, ProfileSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Like,
    Vote,
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRecord {
    pub id: i64,
    pub recipient_id: i64,
    pub sender_id: i64,
    pub kind: NotificationKind,
    pub post_id: Option<i64>,
    pub link: String,
    pub read: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub sender: ProfileSummary,
    pub post_id: Option<i64>,
    pub link: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationView {
    pub fn new(record: NotificationRecord, sender: ProfileSummary) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            sender,
            post_id: record.post_id,
            link: record.link,
            read: record.read,
            created_at: millis_to_datetime(record.created_at),
        }
    }
}

/// Link embedded in a notification, relative to the public web app.
pub fn notification_link(base_url: &str, kind: NotificationKind, post_id: Option<i64>, sender_username: &str) -> String {
    let base = base_url.trim_end_matches('/');
    match (kind, post_id) {
        (NotificationKind::Like, Some(post_id)) => format!("{}/posts/{}", base, post_id),
        _ => format!("{}/{}", base, sender_username),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links() {
        assert_eq!(
            notification_link("https://app.test/", NotificationKind::Like, Some(9), "amy"),
            "https://app.test/posts/9"
        );
        assert_eq!(
            notification_link("https://app.test", NotificationKind::Follow, None, "amy"),
            "https://app.test/amy"
        );
    }
}
