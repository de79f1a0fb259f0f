use axum::{
    body::Bytes,
    extract::State,
    routing::{get, patch, post},
    Router,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use super::cookies::{with_session, without_session};
use super::extract::{Json, Path, Query};
use super::multipart::MultipartForm;
use super::response::ApiResponse;
use crate::app_state::AppState;
use crate::database::{ContestantFilters, ContestantSort, ContestantSummary, FilterOptions, ProfileUpdate};
use crate::error::{AppError, AppResult};
use crate::infrastructure::middleware::{CurrentUser, REFRESH_TOKEN_COOKIE};
use crate::infrastructure::security::TokenPair;
use crate::models::{Page, PageRequest, Role, UserView};
use crate::services::feed::{self, ProfileInfo};
use crate::services::identity::{self, ChangePasswordRequest, ContestantAttributes, LoginRequest, RegisterRequest};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user: UserView,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePhoneRequest {
    pub phone: String,
    pub code: String,
}

/// Query string of the contestant listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestantQuery {
    pub query: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
    #[serde(default)]
    pub sort: ContestantSort,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ContestantQuery {
    pub fn into_parts(self) -> (ContestantFilters, PageRequest) {
        let page = PageRequest {
            page: self.page,
            limit: self.limit,
        };
        let filters = ContestantFilters {
            query: self.query,
            country: self.country,
            state: self.state,
            city: self.city,
            eye_color: self.eye_color,
            hair_color: self.hair_color,
            sort: self.sort,
            include_suspended: false,
        };
        (filters, page)
    }
}

async fn register_voter(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<ApiResponse<UserView>> {
    let user = identity::register(&state, Role::Voter, request).await?;
    Ok(ApiResponse::created(UserView::from(user), "User registered successfully"))
}

async fn register_contestant(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<ApiResponse<UserView>> {
    let user = identity::register(&state, Role::Contestant, request).await?;
    Ok(ApiResponse::created(UserView::from(user), "Contestant registered successfully"))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> AppResult<(CookieJar, ApiResponse<SessionData>)> {
    let (user, tokens) = identity::login(&state, request).await?;
    let jar = with_session(jar, &tokens, state.config.auth.cookie_secure);
    let data = SessionData {
        user: UserView::from(user),
        tokens,
    };
    Ok((jar, ApiResponse::ok(data, "User logged in successfully")))
}

/// Refresh token from the cookie, or from a JSON body when there is none.
async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<(CookieJar, ApiResponse<TokenPair>)> {
    let from_cookie = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());
    let token = match from_cookie {
        Some(token) => Some(token),
        None if !body.is_empty() => serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?
            .refresh_token,
        None => None,
    }
    .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

    let tokens = identity::refresh_session(&state, &token).await?;
    let jar = with_session(jar, &tokens, state.config.auth.cookie_secure);
    Ok((jar, ApiResponse::ok(tokens, "Access token refreshed")))
}

async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, ApiResponse<()>)> {
    identity::logout(&state, user.id).await?;
    Ok((without_session(jar), ApiResponse::ok((), "User logged out successfully")))
}

async fn current_user(CurrentUser(user): CurrentUser) -> ApiResponse<UserView> {
    ApiResponse::ok(UserView::from(user), "Current user fetched successfully")
}

async fn update_phone(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdatePhoneRequest>,
) -> AppResult<ApiResponse<UserView>> {
    let user = identity::update_phone(&state, &user, &request.phone, &request.code).await?;
    Ok(ApiResponse::ok(UserView::from(user), "Phone number updated successfully"))
}

async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    identity::change_password(&state, &user, request).await?;
    Ok(ApiResponse::ok((), "Password changed successfully"))
}

async fn upgrade_contestant(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(attributes): Json<ContestantAttributes>,
) -> AppResult<ApiResponse<UserView>> {
    let user = identity::upgrade_to_contestant(&state, &user, attributes).await?;
    Ok(ApiResponse::ok(UserView::from(user), "Account upgraded to contestant"))
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<ApiResponse<UserView>> {
    let user = identity::update_profile(&state, &user, update).await?;
    Ok(ApiResponse::ok(UserView::from(user), "Profile updated successfully"))
}

async fn update_profile_photo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut form: MultipartForm,
) -> AppResult<ApiResponse<UserView>> {
    let photo = form
        .take_file("photo")
        .ok_or_else(|| AppError::Validation("photo is required".to_string()))?;
    let user = identity::update_photo(&state, &user, photo).await?;
    Ok(ApiResponse::ok(UserView::from(user), "Profile photo updated successfully"))
}

async fn profile_info(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<ProfileInfo>> {
    let viewer_id = viewer.map(|CurrentUser(v)| v.id);
    let info = feed::profile_info(&state, viewer_id, &username.to_lowercase()).await?;
    Ok(ApiResponse::ok(info, "User profile fetched successfully"))
}

async fn contestants(
    State(state): State<AppState>,
    Query(query): Query<ContestantQuery>,
) -> AppResult<ApiResponse<Page<ContestantSummary>>> {
    let (filters, page) = query.into_parts();
    let contestants = feed::contestants(&state, &filters, page).await?;
    Ok(ApiResponse::ok(contestants, "Contestants fetched successfully"))
}

async fn contestant_filtering_options(State(state): State<AppState>) -> AppResult<ApiResponse<FilterOptions>> {
    let options = feed::contestant_filter_options(&state).await?;
    Ok(ApiResponse::ok(options, "Filtering options fetched successfully"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register-voter", post(register_voter))
        .route("/register-contestant", post(register_contestant))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
        .route("/current-user", get(current_user))
        .route("/update-phone", patch(update_phone))
        .route("/change-password", patch(change_password))
        .route("/upgrade-contestant", patch(upgrade_contestant))
        .route("/update-profile", patch(update_profile))
        .route("/update-profile-photo", patch(update_profile_photo))
        .route("/p/{username}", get(profile_info))
        .route("/contestants", get(contestants))
        .route("/contestant-filtering-options", post(contestant_filtering_options))
}
