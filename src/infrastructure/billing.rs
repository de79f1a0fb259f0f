// Subscription billing through a Stripe-style REST API, plus webhook
// signature verification.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::instrument;

use crate::config::BillingConfig;
use crate::error::AppError;

/// Accepted clock skew between the signature timestamp and now.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("billing provider returned {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("billing provider response missing {0}")]
    MissingField(&'static str),
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        AppError::ExternalService(err.to_string())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing signature header")]
    MissingHeader,
    #[error("Malformed signature header")]
    Malformed,
    #[error("Timestamp outside the tolerance zone")]
    Expired,
    #[error("No signatures found matching the expected signature for payload")]
    Mismatch,
}

impl From<SignatureError> for AppError {
    fn from(err: SignatureError) -> Self {
        AppError::InvalidSignature(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: i64,
    pub email: String,
    pub amount: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Provider-side subscription state; `current_period_end` in unix seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer_id: String,
    pub price_id: String,
    pub current_period_end: i64,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Hosted checkout page URL for a new subscription.
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<String, BillingError>;
    /// Self-service portal URL for an existing customer.
    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<String, BillingError>;
    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<ProviderSubscription, BillingError>;
}

/// Check a `t=<unix>,v1=<hex>` signature header against the raw payload.
pub fn verify_webhook_signature(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    now_secs: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingHeader)?;

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for pair in header.split(',') {
        match pair.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if now_secs.abs_diff(timestamp) > WEBHOOK_TOLERANCE_SECS.unsigned_abs() {
        return Err(SignatureError::Expired);
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mut mac = <Hmac<Sha256>>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(SignatureError::Mismatch)
}

/// Header value for `payload`, as the provider would send it.
pub fn sign_webhook_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let Ok(mut mac) = <Hmac<Sha256>>::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct UrlResponse {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    id: String,
    customer: String,
    current_period_end: i64,
    items: SubscriptionItems,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItems {
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    price: SubscriptionPrice,
}

#[derive(Debug, Deserialize)]
struct SubscriptionPrice {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(config: &BillingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        }
    }

    async fn read<T: serde::de::DeserializeOwned>(res: reqwest::Response) -> Result<T, BillingError> {
        let status = res.status();
        if !status.is_success() {
            let message = res
                .json::<ProviderErrorBody>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(BillingError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(res.json::<T>().await?)
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, BillingError> {
        let res = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;
        Self::read(res).await
    }
}

fn field(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

#[async_trait]
impl BillingProvider for StripeClient {
    #[instrument(skip(self, request), fields(user_id = request.user_id))]
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<String, BillingError> {
        let form = vec![
            field("mode", "subscription"),
            field("payment_method_types[0]", "card"),
            field("customer_email", &request.email),
            field("success_url", &request.success_url),
            field("cancel_url", &request.cancel_url),
            field("billing_address_collection", "auto"),
            field("line_items[0][quantity]", 1),
            field("line_items[0][price_data][currency]", &request.currency),
            field("line_items[0][price_data][unit_amount]", request.amount),
            field("line_items[0][price_data][recurring][interval]", "month"),
            field("line_items[0][price_data][product_data][name]", "Contestant subscription"),
            field("metadata[userId]", request.user_id),
        ];
        let body: UrlResponse = self.post_form("/v1/checkout/sessions", &form).await?;
        body.url.ok_or(BillingError::MissingField("url"))
    }

    #[instrument(skip(self))]
    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<String, BillingError> {
        let form = vec![field("customer", customer_id), field("return_url", return_url)];
        let body: UrlResponse = self.post_form("/v1/billing_portal/sessions", &form).await?;
        body.url.ok_or(BillingError::MissingField("url"))
    }

    #[instrument(skip(self))]
    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<ProviderSubscription, BillingError> {
        let res = self
            .client
            .get(format!("{}/v1/subscriptions/{}", self.api_base, subscription_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let body: SubscriptionResponse = Self::read(res).await?;
        let price_id = body
            .items
            .data
            .into_iter()
            .next()
            .map(|item| item.price.id)
            .ok_or(BillingError::MissingField("items.data[0].price.id"))?;
        Ok(ProviderSubscription {
            id: body.id,
            customer_id: body.customer,
            price_id,
            current_period_end: body.current_period_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"type":"invoice.payment_succeeded"}"#;
        let header = sign_webhook_payload(payload, SECRET, 1_700_000_000);
        assert_eq!(verify_webhook_signature(payload, Some(&header), SECRET, 1_700_000_100), Ok(()));
    }

    #[test]
    fn test_tampered_payload_and_wrong_secret() {
        let header = sign_webhook_payload(b"original", SECRET, 1_700_000_000);
        assert_eq!(
            verify_webhook_signature(b"tampered", Some(&header), SECRET, 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_webhook_signature(b"original", Some(&header), "other", 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stale_and_malformed_headers() {
        let header = sign_webhook_payload(b"x", SECRET, 1_700_000_000);
        assert_eq!(
            verify_webhook_signature(b"x", Some(&header), SECRET, 1_700_000_000 + WEBHOOK_TOLERANCE_SECS + 1),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            verify_webhook_signature(b"x", Some("t=-9223372036854775808,v1=00"), SECRET, 1_700_000_000),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            verify_webhook_signature(b"x", Some("t=9223372036854775807,v1=00"), SECRET, -1),
            Err(SignatureError::Expired)
        );
        assert_eq!(verify_webhook_signature(b"x", None, SECRET, 0), Err(SignatureError::MissingHeader));
        assert_eq!(
            verify_webhook_signature(b"x", Some("v1=abcd"), SECRET, 0),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let good = sign_webhook_payload(b"x", SECRET, 10);
        let v1 = good.split("v1=").nth(1).unwrap();
        let header = format!("t=10,v1=deadbeef,v0=zz,v1={}", v1);
        assert!(verify_webhook_signature(b"x", Some(&header), SECRET, 10).is_ok());
    }

    #[test]
    fn test_event_parsing() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"subscription":"sub_1","metadata":{"userId":"42"}}}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.data.object["metadata"]["userId"], "42");
    }
}
