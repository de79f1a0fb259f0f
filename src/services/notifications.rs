use serde::Serialize;
use tracing::instrument;

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::models::{NotificationView, Page, PageRequest};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    #[serde(flatten)]
    pub page: Page<NotificationView>,
    pub unread_count: i64,
}

pub async fn list(state: &AppState, user_id: i64, page: PageRequest) -> AppResult<NotificationFeed> {
    let notifications = state.db.list_notifications(user_id, page).await?;
    let unread_count = state.db.unread_notification_count(user_id).await?;
    Ok(NotificationFeed {
        page: notifications,
        unread_count,
    })
}

#[instrument(skip(state))]
pub async fn mark_all_read(state: &AppState, user_id: i64) -> AppResult<u64> {
    state.db.mark_notifications_read(user_id).await
}
