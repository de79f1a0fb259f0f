// Registration, login, session rotation and account maintenance for users and admins.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::app_state::AppState;
use crate::database::{NewUser, ProfileUpdate};
use crate::error::{AppError, AppResult};
use crate::infrastructure::media::{delete_all, UploadFile};
use crate::infrastructure::security::{hash_password, validate_password, verify_password, PrincipalKind, TokenPair};
use crate::models::{current_time_millis, AdminRecord, MediaAsset, Role, UserRecord};

use super::verification::normalize_phone;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));
static USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_.]{3,30}$").expect("valid username pattern"));

const PASSWORD_POLICY: &str =
    "Password must be at least 8 characters long and contain one special character (!@#$%^&*)";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub nationality: Option<String>,
    pub country: String,
    pub state: String,
    pub city: String,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestantAttributes {
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
}

/// Physical attributes are mandatory and positive for contestants.
fn require_attributes(attributes: &ContestantAttributes) -> AppResult<(f64, f64, String, String)> {
    let eye = attributes.eye_color.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let hair = attributes.hair_color.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let (Some(eye), Some(hair)) = (eye, hair) else {
        return Err(AppError::Validation(
            "EyeColor and HairColor are required for contestants".to_string(),
        ));
    };
    match (attributes.height, attributes.weight) {
        (Some(height), Some(weight)) if height > 0.0 && weight > 0.0 => {
            Ok((height, weight, eye.to_lowercase(), hair.to_lowercase()))
        }
        _ => Err(AppError::Validation(
            "Height and Weight are required for contestants".to_string(),
        )),
    }
}

fn required(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(state: &AppState, role: Role, request: RegisterRequest) -> AppResult<UserRecord> {
    let username = required("username", &request.username)?.to_lowercase();
    let email = required("email", &request.email)?.to_lowercase();
    if !USERNAME.is_match(&username) {
        return Err(AppError::Validation(
            "Username must be 3-30 characters of letters, digits, '_' or '.'".to_string(),
        ));
    }
    if !EMAIL.is_match(&email) {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if !validate_password(&request.password) {
        return Err(AppError::Validation(PASSWORD_POLICY.to_string()));
    }

    let (height, weight, eye_color, hair_color) = match role {
        Role::Contestant => {
            let (height, weight, eye, hair) = require_attributes(&ContestantAttributes {
                height: request.height,
                weight: request.weight,
                eye_color: request.eye_color.clone(),
                hair_color: request.hair_color.clone(),
            })?;
            (Some(height), Some(weight), Some(eye), Some(hair))
        }
        Role::Voter => (None, None, None, None),
    };

    if state.db.username_or_email_taken(&username, &email).await? {
        return Err(AppError::Conflict("User with this email or username already exists!".to_string()));
    }

    let new_user = NewUser {
        username,
        email,
        password_hash: hash_password(&request.password)?,
        first_name: required("firstName", &request.first_name)?,
        last_name: required("lastName", &request.last_name)?,
        phone: required("phone", &request.phone)?,
        date_of_birth: request.date_of_birth,
        nationality: request.nationality.filter(|n| !n.trim().is_empty()),
        country: required("country", &request.country)?,
        state: required("state", &request.state)?,
        city: required("city", &request.city)?,
        role,
        height,
        weight,
        eye_color,
        hair_color,
    };

    let user = state.db.insert_user(new_user).await?;
    info!(user_id = user.id, role = role.as_str(), "User registered");
    Ok(user)
}

#[instrument(skip(state, request))]
pub async fn login(state: &AppState, request: LoginRequest) -> AppResult<(UserRecord, TokenPair)> {
    let username = request.username.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let email = request.email.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if username.is_none() && email.is_none() {
        return Err(AppError::BadRequest("Username or email is required".to_string()));
    }

    let user = state
        .db
        .find_user_by_login(username, email)
        .await?
        .ok_or_else(|| AppError::Forbidden("User with this username or email does not exist".to_string()))?;
    if !verify_password(&request.password, &user.password_hash) {
        warn!(user_id = user.id, "Login rejected: wrong password");
        return Err(AppError::Forbidden("Wrong password".to_string()));
    }
    if !user.is_active() {
        return Err(AppError::Forbidden("This account has been suspended".to_string()));
    }

    let tokens = issue_user_tokens(state, &user).await?;
    info!(user_id = user.id, "User logged in");
    Ok((user, tokens))
}

async fn issue_user_tokens(state: &AppState, user: &UserRecord) -> AppResult<TokenPair> {
    let tokens = state.tokens.issue_pair(user.id, &user.username, PrincipalKind::User)?;
    state.db.set_user_refresh_token(user.id, Some(&tokens.refresh_token)).await?;
    Ok(tokens)
}

/// Exchange a refresh token for a new pair. The presented token must be the
/// one last issued; it is replaced by the new one.
#[instrument(skip_all)]
pub async fn refresh_session(state: &AppState, refresh_token: &str) -> AppResult<TokenPair> {
    let claims = state.tokens.verify_refresh(refresh_token)?;
    let invalid = || AppError::Unauthorized("Refresh token is expired or used".to_string());

    match claims.kind {
        PrincipalKind::User => {
            let user = state.db.find_user(claims.subject_id()?).await?.ok_or_else(invalid)?;
            if !user.is_active() {
                return Err(AppError::Unauthorized("Account is suspended".to_string()));
            }
            if user.refresh_token.as_deref() != Some(refresh_token) {
                return Err(invalid());
            }
            issue_user_tokens(state, &user).await
        }
        PrincipalKind::Admin => {
            let admin = state.db.find_admin(claims.subject_id()?).await?.ok_or_else(invalid)?;
            if admin.refresh_token.as_deref() != Some(refresh_token) {
                return Err(invalid());
            }
            issue_admin_tokens(state, &admin).await
        }
    }
}

pub async fn logout(state: &AppState, user_id: i64) -> AppResult<()> {
    state.db.set_user_refresh_token(user_id, None).await?;
    info!(user_id, "User logged out");
    Ok(())
}

#[instrument(skip(state, user, request), fields(user_id = user.id))]
pub async fn change_password(state: &AppState, user: &UserRecord, request: ChangePasswordRequest) -> AppResult<()> {
    if request.new_password != request.confirm_password {
        return Err(AppError::BadRequest("New password and confirm password do not match".to_string()));
    }
    if !verify_password(&request.old_password, &user.password_hash) {
        return Err(AppError::Unauthorized("Invalid old password".to_string()));
    }
    if !validate_password(&request.new_password) {
        return Err(AppError::Validation(PASSWORD_POLICY.to_string()));
    }
    state
        .db
        .update_user_password(user.id, &hash_password(&request.new_password)?)
        .await?;
    info!("Password changed");
    Ok(())
}

#[instrument(skip(state, user, code), fields(user_id = user.id))]
pub async fn update_phone(state: &AppState, user: &UserRecord, phone: &str, code: &str) -> AppResult<UserRecord> {
    let phone = normalize_phone(phone)?;
    let code = required("code", code)?;
    if !state.otp.check_code(&phone, &code).await? {
        return Err(AppError::BadRequest("Invalid verification code".to_string()));
    }
    let user = state.db.mark_phone_verified(user.id, &phone).await?;
    info!("Phone number verified");
    Ok(user)
}

pub async fn update_profile(state: &AppState, user: &UserRecord, update: ProfileUpdate) -> AppResult<UserRecord> {
    if update.display_name.trim().is_empty() {
        return Err(AppError::Validation("displayName is required".to_string()));
    }
    state.db.update_user_profile(user.id, &update).await
}

/// Upload the new photo first; the previous remote photo is removed only after
/// the row points at the new one.
#[instrument(skip(state, user, file), fields(user_id = user.id))]
pub async fn update_photo(state: &AppState, user: &UserRecord, file: UploadFile) -> AppResult<UserRecord> {
    if file.resource_type()? != "image" {
        return Err(AppError::BadRequest("Profile photo must be an image".to_string()));
    }
    let uploaded = state.media.upload(file).await?;
    let updated = match state.db.update_user_photo(user.id, &uploaded).await {
        Ok(updated) => updated,
        Err(err) => {
            delete_all(state.media.as_ref(), std::slice::from_ref(&uploaded)).await;
            return Err(err);
        }
    };

    if let (Some(url), Some(public_id)) = (user.photo_url.clone(), user.photo_public_id.clone()) {
        let previous = MediaAsset {
            url,
            public_id,
            resource_type: "image".to_string(),
        };
        delete_all(state.media.as_ref(), &[previous]).await;
    }
    Ok(updated)
}

/// Voter to contestant, gated on a live subscription.
#[instrument(skip(state, user, attributes), fields(user_id = user.id))]
pub async fn upgrade_to_contestant(
    state: &AppState,
    user: &UserRecord,
    attributes: ContestantAttributes,
) -> AppResult<UserRecord> {
    if user.is_contestant() {
        return Err(AppError::BadRequest("User is already a contestant".to_string()));
    }
    let (height, weight, eye_color, hair_color) = require_attributes(&attributes)?;

    let subscription = state.db.find_subscription_for_user(user.id).await?;
    let subscribed = subscription
        .as_ref()
        .is_some_and(|s| s.is_valid_at(current_time_millis()));
    if !subscribed {
        warn!("Upgrade refused: no valid subscription");
        return Err(AppError::Forbidden(
            "An active subscription is required to become a contestant".to_string(),
        ));
    }

    let user = state
        .db
        .upgrade_user_to_contestant(user.id, height, weight, &eye_color, &hair_color)
        .await?;
    info!("User upgraded to contestant");
    Ok(user)
}

/// Create the configured bootstrap admins; refused once any admin exists.
#[instrument(skip(state))]
pub async fn create_admins(state: &AppState) -> AppResult<Vec<AdminRecord>> {
    if state.db.count_admins().await? > 0 {
        return Err(AppError::BadRequest("Admins have already been created".to_string()));
    }
    let admin = &state.config.admin;
    if admin.bootstrap_usernames.is_empty() {
        return Err(AppError::ConfigurationError("No bootstrap admin usernames configured".to_string()));
    }
    let password_hash = hash_password(&admin.bootstrap_password)?;
    let accounts: Vec<(String, String)> = admin
        .bootstrap_usernames
        .iter()
        .map(|username| (username.clone(), password_hash.clone()))
        .collect();

    let created = state.db.insert_admins(&accounts).await?;
    info!(count = created.len(), "Bootstrap admins created");
    Ok(created)
}

#[instrument(skip(state, password))]
pub async fn admin_login(state: &AppState, username: &str, password: &str) -> AppResult<(AdminRecord, TokenPair)> {
    let username = required("username", username)?;
    let admin = state
        .db
        .find_admin_by_username(&username)
        .await?
        .ok_or_else(|| AppError::Forbidden("Admin does not exist".to_string()))?;
    if !verify_password(password, &admin.password_hash) {
        warn!(admin_id = admin.id, "Admin login rejected: wrong password");
        return Err(AppError::Forbidden("Wrong password".to_string()));
    }
    let tokens = issue_admin_tokens(state, &admin).await?;
    info!(admin_id = admin.id, "Admin logged in");
    Ok((admin, tokens))
}

async fn issue_admin_tokens(state: &AppState, admin: &AdminRecord) -> AppResult<TokenPair> {
    let tokens = state.tokens.issue_pair(admin.id, &admin.username, PrincipalKind::Admin)?;
    state.db.set_admin_refresh_token(admin.id, Some(&tokens.refresh_token)).await?;
    Ok(tokens)
}

pub async fn admin_logout(state: &AppState, admin_id: i64) -> AppResult<()> {
    state.db.set_admin_refresh_token(admin_id, None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contestant_attributes_required() {
        let missing = ContestantAttributes {
            height: Some(170.0),
            weight: None,
            eye_color: Some("brown".to_string()),
            hair_color: Some("black".to_string()),
        };
        assert!(matches!(require_attributes(&missing), Err(AppError::Validation(_))));

        let blank_color = ContestantAttributes {
            height: Some(170.0),
            weight: Some(60.0),
            eye_color: Some("  ".to_string()),
            hair_color: Some("black".to_string()),
        };
        assert!(require_attributes(&blank_color).is_err());

        let complete = ContestantAttributes {
            eye_color: Some("Brown".to_string()),
            ..blank_color
        };
        let (_, _, eye, _) = require_attributes(&complete).unwrap();
        assert_eq!(eye, "brown");
    }

    #[test]
    fn test_username_and_email_patterns() {
        assert!(USERNAME.is_match("amy_01.x"));
        assert!(!USERNAME.is_match("am"));
        assert!(!USERNAME.is_match("amy smith"));
        assert!(EMAIL.is_match("amy@example.com"));
        assert!(!EMAIL.is_match("amy@example"));
    }
}
