use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::{millis_to_datetime, FeedPost, MediaAsset};

#[derive(Debug, Clone, FromRow)]
pub struct HighlightRecord {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub cover_url: String,
    pub cover_public_id: String,
    pub post_id: Option<i64>,
    pub created_at: i64,
}

impl HighlightRecord {
    pub fn cover(&self) -> MediaAsset {
        MediaAsset {
            url: self.cover_url.clone(),
            public_id: self.cover_public_id.clone(),
            resource_type: "image".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightView {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub cover: MediaAsset,
    pub post_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<FeedPost>,
    pub created_at: DateTime<Utc>,
}

impl HighlightView {
    pub fn new(record: HighlightRecord, post: Option<FeedPost>) -> Self {
        Self {
            id: record.id,
            owner_id: record.owner_id,
            cover: record.cover(),
            title: record.title,
            post_id: record.post_id,
            post,
            created_at: millis_to_datetime(record.created_at),
        }
    }
}

impl From<HighlightRecord> for HighlightView {
    fn from(record: HighlightRecord) -> Self {
        HighlightView::new(record, None)
    }
}
