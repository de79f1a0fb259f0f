use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Router,
};

use super::response::ApiResponse;
use crate::app_state::AppState;
use crate::error::AppResult;
use crate::infrastructure::middleware::CurrentUser;
use crate::models::subscription::SubscriptionStatus;
use crate::services::billing::{self, SubscribeLink, WebhookAck};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

async fn check(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<SubscriptionStatus>> {
    let status = billing::check(&state, &user).await?;
    Ok(ApiResponse::ok(status, "Subscription status fetched successfully"))
}

async fn subscribe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<SubscribeLink>> {
    let link = billing::subscribe(&state, &user).await?;
    Ok(ApiResponse::ok(link, "Billing session created"))
}

/// The raw body is needed as-is for the signature check.
async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> AppResult<ApiResponse<WebhookAck>> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let ack = billing::handle_webhook(&state, &body, signature).await?;
    Ok(ApiResponse::ok(ack, "Webhook received"))
}

pub fn subscriptions_router() -> Router<AppState> {
    Router::new()
        .route("/check", get(check))
        .route("/subscribe", post(subscribe))
}

pub fn webhook_router() -> Router<AppState> {
    Router::new().route("/webhook", post(webhook))
}
