// One-time passcode delivery and verification through a Verify-style API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::SmsConfig;
use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("verification service returned {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl From<SmsError> for AppError {
    fn from(err: SmsError) -> Self {
        match err {
            SmsError::Rejected { status, message } if (400..500).contains(&status) => {
                AppError::BadRequest(message)
            }
            other => AppError::ExternalService(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    Sms,
    #[default]
    Whatsapp,
    Call,
}

impl OtpChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpChannel::Sms => "sms",
            OtpChannel::Whatsapp => "whatsapp",
            OtpChannel::Call => "call",
        }
    }
}

#[async_trait]
pub trait OtpVerifier: Send + Sync {
    /// Start a verification; returns the provider status (usually `pending`).
    async fn send_code(&self, phone: &str, channel: OtpChannel) -> Result<String, SmsError>;
    /// `true` when the provider approved the code.
    async fn check_code(&self, phone: &str, code: &str) -> Result<bool, SmsError>;
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

pub struct TwilioVerifyClient {
    client: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    service_sid: String,
}

impl TwilioVerifyClient {
    pub fn new(config: &SmsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            service_sid: config.verify_sid.clone(),
        }
    }

    async fn post(&self, resource: &str, form: &[(&str, &str)]) -> Result<VerificationResponse, SmsError> {
        let url = format!("{}/v2/Services/{}/{}", self.api_base, self.service_sid, resource);
        let res = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(form)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let message = res
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| status.to_string());
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(res.json::<VerificationResponse>().await?)
    }
}

#[async_trait]
impl OtpVerifier for TwilioVerifyClient {
    #[instrument(skip(self))]
    async fn send_code(&self, phone: &str, channel: OtpChannel) -> Result<String, SmsError> {
        let body = self
            .post("Verifications", &[("To", phone), ("Channel", channel.as_str())])
            .await?;
        Ok(body.status)
    }

    #[instrument(skip(self, code))]
    async fn check_code(&self, phone: &str, code: &str) -> Result<bool, SmsError> {
        let body = self.post("VerificationCheck", &[("To", phone), ("Code", code)]).await?;
        Ok(body.status == "approved")
    }
}
