// Authentication extractors. Tokens come from the `accessToken` cookie or an
// `Authorization: Bearer` header; the principal is reloaded on every request.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::CookieJar;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::infrastructure::security::{Claims, PrincipalKind};
use crate::models::{AdminRecord, UserRecord};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Raw access token from the cookie, falling back to the bearer header.
pub fn access_token_from_parts(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn claims_for(parts: &Parts, state: &AppState, kind: PrincipalKind) -> Result<Claims, AppError> {
    let token = access_token_from_parts(parts)
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;
    let claims = state.tokens.verify_access(&token)?;
    if claims.kind != kind {
        return Err(AppError::Unauthorized("Invalid access token".to_string()));
    }
    Ok(claims)
}

/// Authenticated user whose account exists and is not suspended.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims_for(parts, state, PrincipalKind::User)?;
        let user = state
            .db
            .find_user(claims.subject_id()?)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid access token".to_string()))?;
        if !user.is_active() {
            return Err(AppError::Unauthorized("Account is suspended".to_string()));
        }
        Ok(CurrentUser(user))
    }
}

/// `Option<CurrentUser>` for routes that also serve guests. A present but
/// invalid token is still rejected.
impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>, Self::Rejection> {
        if access_token_from_parts(parts).is_none() {
            return Ok(None);
        }
        <CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

/// Authenticated admin whose account still exists.
#[derive(Debug, Clone)]
pub struct CurrentAdmin(pub AdminRecord);

impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims_for(parts, state, PrincipalKind::Admin)?;
        let admin = state
            .db
            .find_admin(claims.subject_id()?)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid access token".to_string()))?;
        Ok(CurrentAdmin(admin))
    }
}
