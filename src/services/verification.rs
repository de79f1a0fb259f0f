use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::infrastructure::sms::OtpChannel;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub phone: String,
    #[serde(default)]
    pub channel: OtpChannel,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub phone: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpCheck {
    pub approved: bool,
}

/// Loose E.164 shape: optional `+`, then 8 to 15 digits.
pub fn normalize_phone(raw: &str) -> AppResult<String> {
    let trimmed: String = raw.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')')).collect();
    let digits = trimmed.strip_prefix('+').unwrap_or(&trimmed);
    if digits.len() < 8 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("A valid phone number is required".to_string()));
    }
    Ok(format!("+{}", digits))
}

#[instrument(skip(state, request), fields(channel = request.channel.as_str()))]
pub async fn send_otp(state: &AppState, request: SendOtpRequest) -> AppResult<OtpStatus> {
    let phone = normalize_phone(&request.phone)?;
    let status = state.otp.send_code(&phone, request.channel).await?;
    info!(status = %status, "Verification code sent");
    Ok(OtpStatus { status })
}

#[instrument(skip(state, request))]
pub async fn verify_otp(state: &AppState, request: VerifyOtpRequest) -> AppResult<OtpCheck> {
    let phone = normalize_phone(&request.phone)?;
    let code = request.code.trim();
    if code.is_empty() {
        return Err(AppError::Validation("code is required".to_string()));
    }
    let approved = state.otp.check_code(&phone, code).await?;
    Ok(OtpCheck { approved })
}
