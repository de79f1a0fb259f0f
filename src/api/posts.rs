use axum::{
    extract::State,
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;

use super::extract::{Json, Path, Query};
use super::multipart::MultipartForm;
use super::response::ApiResponse;
use crate::app_state::AppState;
use crate::error::AppResult;
use crate::infrastructure::middleware::CurrentUser;
use crate::models::{FeedPost, Page, PageRequest, ProfileSummary};
use crate::services::feed;
use crate::services::posts::{self, Requester};

#[derive(Debug, Deserialize)]
pub struct EditPostRequest {
    pub caption: Option<String>,
    pub location: Option<String>,
}

async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut form: MultipartForm,
) -> AppResult<ApiResponse<FeedPost>> {
    let files = form.take_files("media");
    let post = posts::create_post(&state, &user, form.text("caption"), form.text("location"), files).await?;
    Ok(ApiResponse::created(
        FeedPost::new(post, ProfileSummary::from(&user)),
        "Post created successfully, awaiting review",
    ))
}

async fn edit_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
    Json(request): Json<EditPostRequest>,
) -> AppResult<ApiResponse<FeedPost>> {
    let post = posts::edit_post(&state, &user, post_id, request.caption, request.location).await?;
    Ok(ApiResponse::ok(
        FeedPost::new(post, ProfileSummary::from(&user)),
        "Post updated successfully",
    ))
}

async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    posts::delete_post(&state, Requester::User(user.id), post_id).await?;
    Ok(ApiResponse::ok((), "Post deleted successfully"))
}

async fn post_by_id(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(post_id): Path<i64>,
) -> AppResult<ApiResponse<FeedPost>> {
    let viewer_id = viewer.map(|CurrentUser(v)| v.id);
    let post = feed::post_by_id(&state, viewer_id, post_id).await?;
    Ok(ApiResponse::ok(post, "Post fetched successfully"))
}

async fn feed_posts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageRequest>,
) -> AppResult<ApiResponse<Page<FeedPost>>> {
    let posts = feed::user_feed(&state, user.id, page).await?;
    Ok(ApiResponse::ok(posts, "Feed fetched successfully"))
}

async fn guest_posts(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> AppResult<ApiResponse<Page<FeedPost>>> {
    let posts = feed::guest_feed(&state, page).await?;
    Ok(ApiResponse::ok(posts, "Posts fetched successfully"))
}

async fn more_posts(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(user_id): Path<i64>,
    Query(page): Query<PageRequest>,
) -> AppResult<ApiResponse<Page<FeedPost>>> {
    let viewer_id = viewer.map(|CurrentUser(v)| v.id);
    let posts = feed::more_posts_of_user(&state, viewer_id, user_id, page).await?;
    Ok(ApiResponse::ok(posts, "Posts fetched successfully"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_post))
        .route("/edit/{post_id}", patch(edit_post))
        .route("/delete/{post_id}", post(delete_post))
        .route("/p/{post_id}", get(post_by_id))
        .route("/feed-posts", get(feed_posts))
        .route("/guest-posts", get(guest_posts))
        .route("/more-posts/{user_id}", get(more_posts))
}
