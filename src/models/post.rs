use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use super::{millis_to_datetime, ProfileSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PostStatus {
    Pending,
    Approved,
    Rejected,
}

/// A remote media object as returned by the media store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub url: String,
    pub public_id: String,
    pub resource_type: String,
}

impl MediaAsset {
    pub fn is_video(&self) -> bool {
        self.resource_type == "video"
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PostRecord {
    pub id: i64,
    pub owner_id: i64,
    pub caption: Option<String>,
    pub location: Option<String>,
    pub media: Json<Vec<MediaAsset>>,
    pub media_type: Option<String>,
    pub status: PostStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Post enriched with its owner and the viewer-relative social flags.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub id: i64,
    pub caption: Option<String>,
    pub location: Option<String>,
    pub media: Vec<MediaAsset>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub status: PostStatus,
    pub owner: ProfileSummary,
    pub likes_count: i64,
    pub is_liked: bool,
    pub is_saved: bool,
    pub is_following: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedPost {
    pub fn new(post: PostRecord, owner: ProfileSummary) -> Self {
        Self {
            id: post.id,
            caption: post.caption,
            location: post.location,
            media: post.media.0,
            media_type: post.media_type,
            status: post.status,
            owner,
            likes_count: 0,
            is_liked: false,
            is_saved: false,
            is_following: false,
            created_at: millis_to_datetime(post.created_at),
            updated_at: millis_to_datetime(post.updated_at),
        }
    }
}
