use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use super::extract::{Json, Query};
use super::response::ApiResponse;
use crate::app_state::AppState;
use crate::error::AppResult;
use crate::services::verification::{self, OtpCheck, OtpStatus, SendOtpRequest, VerifyOtpRequest};

async fn send_otp(
    State(state): State<AppState>,
    Query(request): Query<SendOtpRequest>,
) -> AppResult<ApiResponse<OtpStatus>> {
    let status = verification::send_otp(&state, request).await?;
    Ok(ApiResponse::ok(status, "Verification code sent"))
}

async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> AppResult<ApiResponse<OtpCheck>> {
    let check = verification::verify_otp(&state, request).await?;
    let message = if check.approved {
        "Phone number verified"
    } else {
        "Verification code rejected"
    };
    Ok(ApiResponse::ok(check, message))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send-otp", get(send_otp))
        .route("/verify-otp", post(verify_otp))
}
