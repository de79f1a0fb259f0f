// Subscription gate for contestants and the billing provider's webhook.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::infrastructure::billing::{verify_webhook_signature, CheckoutRequest, WebhookEvent};
use crate::models::subscription::SubscriptionStatus;
use crate::models::{current_time_millis, UserRecord};

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const INVOICE_PAID: &str = "invoice.payment_succeeded";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeLink {
    pub url: String,
}

/// What a webhook delivery did, echoed back to the provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    pub event_type: String,
    pub handled: bool,
}

pub async fn check(state: &AppState, user: &UserRecord) -> AppResult<SubscriptionStatus> {
    let record = state.db.find_subscription_for_user(user.id).await?;
    Ok(SubscriptionStatus::from_record(record.as_ref(), current_time_millis()))
}

/// Portal for customers the provider already knows, checkout otherwise.
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn subscribe(state: &AppState, user: &UserRecord) -> AppResult<SubscribeLink> {
    let app_url = state.config.server.public_app_url.trim_end_matches('/');
    let existing = state.db.find_subscription_for_user(user.id).await?;

    let url = match existing.filter(|s| !s.customer_id.is_empty()) {
        Some(subscription) => {
            let return_url = format!("{}/dashboard", app_url);
            state
                .billing
                .create_portal_session(&subscription.customer_id, &return_url)
                .await?
        }
        None => {
            let request = CheckoutRequest {
                user_id: user.id,
                email: user.email.clone(),
                amount: state.config.billing.contestant_fee,
                currency: state.config.billing.currency.clone(),
                success_url: format!("{}/dashboard?subscription=success", app_url),
                cancel_url: format!("{}/dashboard?subscription=cancelled", app_url),
            };
            state.billing.create_checkout_session(&request).await?
        }
    };
    info!("Billing session created");
    Ok(SubscribeLink { url })
}

fn string_field<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn metadata_user_id(object: &Value) -> Option<i64> {
    let raw = object.get("metadata")?.get("userId")?;
    match raw {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Verify the signature over the raw body, then apply the event.
#[instrument(skip(state, payload, signature))]
pub async fn handle_webhook(state: &AppState, payload: &[u8], signature: Option<&str>) -> AppResult<WebhookAck> {
    let now_secs = current_time_millis() / 1000;
    if let Err(err) = verify_webhook_signature(payload, signature, &state.config.billing.webhook_secret, now_secs) {
        warn!("Rejected webhook: {}", err);
        return Err(err.into());
    }

    let event: WebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;
    let object = &event.data.object;

    let handled = match event.event_type.as_str() {
        CHECKOUT_COMPLETED => {
            let user_id = metadata_user_id(object)
                .ok_or_else(|| AppError::NotFound("User id missing from checkout metadata".to_string()))?;
            state
                .db
                .find_user(user_id)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
            let subscription_id = string_field(object, "subscription")
                .ok_or_else(|| AppError::BadRequest("Checkout session has no subscription".to_string()))?;

            let subscription = state.billing.retrieve_subscription(subscription_id).await?;
            state
                .db
                .upsert_subscription(
                    user_id,
                    &subscription.customer_id,
                    &subscription.id,
                    &subscription.price_id,
                    subscription.current_period_end * 1000,
                )
                .await?;
            info!(user_id, "Subscription activated");
            true
        }
        INVOICE_PAID => match string_field(object, "subscription") {
            Some(subscription_id) => {
                let subscription = state.billing.retrieve_subscription(subscription_id).await?;
                let renewed = state
                    .db
                    .renew_subscription(
                        &subscription.id,
                        &subscription.price_id,
                        subscription.current_period_end * 1000,
                    )
                    .await?;
                if renewed.is_none() {
                    warn!(subscription_id, "Invoice paid for an untracked subscription");
                }
                renewed.is_some()
            }
            None => false,
        },
        other => {
            info!(event_type = other, "Ignoring billing event");
            false
        }
    };

    Ok(WebhookAck {
        received: true,
        event_type: event.event_type,
        handled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_user_id_accepts_string_or_number() {
        assert_eq!(metadata_user_id(&json!({"metadata": {"userId": "42"}})), Some(42));
        assert_eq!(metadata_user_id(&json!({"metadata": {"userId": 7}})), Some(7));
        assert_eq!(metadata_user_id(&json!({"metadata": {}})), None);
        assert_eq!(metadata_user_id(&json!({})), None);
    }
}
