// Domain records and API projections

pub mod admin;
pub mod advertisement;
pub mod edge;
pub mod highlight;
pub mod notification;
pub mod pagination;
pub mod post;
pub mod subscription;
pub mod user;

pub use admin::{AdminRecord, AdminView};
pub use advertisement::{AdKind, AdPlacement, AdvertisementRecord, AdvertisementView};
pub use edge::{EdgeKind, ToggleAction, ToggleOutcome};
pub use highlight::{HighlightRecord, HighlightView};
pub use notification::{NotificationKind, NotificationRecord, NotificationView};
pub use pagination::{Page, PageRequest};
pub use post::{FeedPost, MediaAsset, PostRecord, PostStatus};
pub use subscription::SubscriptionRecord;
pub use user::{ProfileSummary, Role, UserRecord, UserStatus, UserView};

use chrono::{DateTime, Utc};

/// Milliseconds since the unix epoch; every table stores time this way.
pub fn current_time_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
}
