use axum::{
    extract::State,
    routing::{get, patch},
    Router,
};
use serde::Serialize;

use super::extract::Query;
use super::response::ApiResponse;
use crate::app_state::AppState;
use crate::error::AppResult;
use crate::infrastructure::middleware::CurrentUser;
use crate::models::PageRequest;
use crate::services::notifications::{self, NotificationFeed};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedRead {
    pub updated: u64,
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageRequest>,
) -> AppResult<ApiResponse<NotificationFeed>> {
    let feed = notifications::list(&state, user.id, page).await?;
    Ok(ApiResponse::ok(feed, "Notifications fetched successfully"))
}

async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<MarkedRead>> {
    let updated = notifications::mark_all_read(&state, user.id).await?;
    Ok(ApiResponse::ok(MarkedRead { updated }, "Notifications marked as read"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/mark-read", patch(mark_read))
}
