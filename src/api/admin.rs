// Admin session routes and the admin dashboard. Every dashboard route takes
// `CurrentAdmin`, so user tokens are rejected there.

use axum::{
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
use super::users::ContestantQuery;
use crate::app_state::AppState;
use crate::database::{CascadeReport, ContestantSummary};
use crate::error::AppResult;
use crate::infrastructure::middleware::CurrentAdmin;
use crate::infrastructure::security::TokenPair;
use crate::models::{AdKind, AdminView, AdvertisementView, FeedPost, Page, PageRequest, PostRecord, PostStatus};
use crate::services::moderation::{
    self, AdvertisementEdit, AdvertisementInput, ContestantStatusChange, ScheduleInput,
};
use crate::services::{identity, posts};

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub admin: AdminView,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeratedPost {
    pub id: i64,
    pub status: PostStatus,
}

impl From<PostRecord> for ModeratedPost {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id,
            status: post.status,
        }
    }
}

async fn create_admins(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<AdminView>>> {
    let admins = identity::create_admins(&state).await?;
    Ok(ApiResponse::created(
        admins.iter().map(AdminView::from).collect(),
        "Admins created successfully",
    ))
}

async fn admin_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<AdminLoginRequest>,
) -> AppResult<(CookieJar, ApiResponse<AdminSession>)> {
    let (admin, tokens) = identity::admin_login(&state, &request.username, &request.password).await?;
    let jar = with_session(jar, &tokens, state.config.auth.cookie_secure);
    let data = AdminSession {
        admin: AdminView::from(&admin),
        tokens,
    };
    Ok((jar, ApiResponse::ok(data, "Admin logged in successfully")))
}

async fn admin_logout(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    jar: CookieJar,
) -> AppResult<(CookieJar, ApiResponse<()>)> {
    identity::admin_logout(&state, admin.id).await?;
    Ok((without_session(jar), ApiResponse::ok((), "Admin logged out successfully")))
}

async fn current_admin(CurrentAdmin(admin): CurrentAdmin) -> ApiResponse<AdminView> {
    ApiResponse::ok(AdminView::from(&admin), "Current admin fetched successfully")
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-admins", post(create_admins))
        .route("/login", post(admin_login))
        .route("/logout", post(admin_logout))
        .route("/current-admin", get(current_admin))
}

async fn create_advertisement(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    mut form: MultipartForm,
) -> AppResult<ApiResponse<AdvertisementView>> {
    let input = AdvertisementInput {
        kind: form.parse::<AdKind>("type")?.unwrap_or(AdKind::Global),
        contestant_id: form.parse("contestantId")?,
        placement: form.parse("placement")?,
        schedule: ScheduleInput {
            start_date: form.required_text("startDate")?,
            start_time: form.required_text("startTime")?,
            end_date: form.required_text("endDate")?,
            end_time: form.required_text("endTime")?,
        },
        hyperlink: form.required_text("hyperlink")?,
    };
    let images = form.take_files("images");
    let ad = moderation::create_advertisement(&state, input, images).await?;
    Ok(ApiResponse::created(ad, "Advertisement created successfully"))
}

async fn edit_advertisement(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(ad_id): Path<i64>,
    Json(edit): Json<AdvertisementEdit>,
) -> AppResult<ApiResponse<AdvertisementView>> {
    let ad = moderation::edit_advertisement(&state, ad_id, edit).await?;
    Ok(ApiResponse::ok(ad, "Advertisement updated successfully"))
}

async fn delete_advertisement(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(ad_id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    moderation::delete_advertisement(&state, ad_id).await?;
    Ok(ApiResponse::ok((), "Advertisement deleted successfully"))
}

async fn toggle_advertisement(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(ad_id): Path<i64>,
) -> AppResult<ApiResponse<AdvertisementView>> {
    let ad = moderation::toggle_advertisement(&state, ad_id).await?;
    let message = if ad.is_active {
        "Advertisement activated"
    } else {
        "Advertisement deactivated"
    };
    Ok(ApiResponse::ok(ad, message))
}

async fn advertisements(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Query(page): Query<PageRequest>,
) -> AppResult<ApiResponse<Page<AdvertisementView>>> {
    let ads = moderation::advertisements(&state, page).await?;
    Ok(ApiResponse::ok(ads, "Advertisements fetched successfully"))
}

async fn contestants(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Query(query): Query<ContestantQuery>,
) -> AppResult<ApiResponse<Page<ContestantSummary>>> {
    let (filters, page) = query.into_parts();
    let contestants = moderation::contestants(&state, filters, page).await?;
    Ok(ApiResponse::ok(contestants, "Contestants fetched successfully"))
}

async fn toggle_contestant(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(contestant_id): Path<i64>,
) -> AppResult<ApiResponse<ContestantStatusChange>> {
    let change = moderation::toggle_contestant_status(&state, contestant_id).await?;
    Ok(ApiResponse::ok(change, "Contestant status updated"))
}

async fn delete_contestant(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(contestant_id): Path<i64>,
) -> AppResult<ApiResponse<CascadeReport>> {
    let report = moderation::delete_contestant(&state, contestant_id).await?;
    Ok(ApiResponse::ok(report, "Contestant deleted successfully"))
}

async fn pending_posts(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Query(page): Query<PageRequest>,
) -> AppResult<ApiResponse<Page<FeedPost>>> {
    let queue = posts::moderation_queue(&state, PostStatus::Pending, page).await?;
    Ok(ApiResponse::ok(queue, "Pending posts fetched successfully"))
}

async fn rejected_posts(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Query(page): Query<PageRequest>,
) -> AppResult<ApiResponse<Page<FeedPost>>> {
    let queue = posts::moderation_queue(&state, PostStatus::Rejected, page).await?;
    Ok(ApiResponse::ok(queue, "Rejected posts fetched successfully"))
}

async fn verify_post(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(post_id): Path<i64>,
) -> AppResult<ApiResponse<ModeratedPost>> {
    let post = posts::set_status(&state, post_id, PostStatus::Approved).await?;
    Ok(ApiResponse::ok(ModeratedPost::from(post), "Post verified successfully"))
}

async fn reject_post(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(post_id): Path<i64>,
) -> AppResult<ApiResponse<ModeratedPost>> {
    let post = posts::set_status(&state, post_id, PostStatus::Rejected).await?;
    Ok(ApiResponse::ok(ModeratedPost::from(post), "Post rejected successfully"))
}

async fn delete_post(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(post_id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    posts::delete_post(&state, posts::Requester::Admin(admin.id), post_id).await?;
    Ok(ApiResponse::ok((), "Post deleted successfully"))
}

pub fn dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/ads", get(advertisements))
        .route("/ads/create-advertisement", post(create_advertisement))
        .route("/ads/edit/{ad_id}", patch(edit_advertisement))
        .route("/ads/delete/{ad_id}", post(delete_advertisement))
        .route("/ads/toggle/{ad_id}", post(toggle_advertisement))
        .route("/contestants", get(contestants))
        .route("/contestants/toggle/{contestant_id}", patch(toggle_contestant))
        .route("/contestants/delete/{contestant_id}", post(delete_contestant))
        .route("/posts/pendings", get(pending_posts))
        .route("/posts/rejecteds", get(rejected_posts))
        .route("/posts/verify/{post_id}", patch(verify_post))
        .route("/posts/reject/{post_id}", patch(reject_post))
        .route("/posts/delete/{post_id}", post(delete_post))
}
