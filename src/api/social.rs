// Follow, like, save and vote routes. Toggles answer 201 when an edge was
// created and 200 when one was removed.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Serialize;

use super::extract::{Path, Query};
use super::response::{ApiResponse, ListQuery};
use crate::app_state::AppState;
use crate::error::AppResult;
use crate::infrastructure::middleware::CurrentUser;
use crate::models::{FeedPost, Page, PageRequest, ProfileSummary, ToggleAction, ToggleOutcome};
use crate::services::{feed, social_graph};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeCount {
    pub post_id: i64,
    pub likes_count: i64,
}

fn toggled(outcome: ToggleOutcome) -> ApiResponse<ToggleOutcome> {
    let status = match outcome.action {
        ToggleAction::Do => StatusCode::CREATED,
        ToggleAction::Undo => StatusCode::OK,
    };
    ApiResponse::new(status, outcome, outcome.message())
}

async fn toggle_follow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(profile_id): Path<i64>,
) -> AppResult<ApiResponse<ToggleOutcome>> {
    Ok(toggled(social_graph::toggle_follow(&state, &user, profile_id).await?))
}

async fn followers(
    State(state): State<AppState>,
    Path(profile_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<ProfileSummary>>> {
    let page = social_graph::followers(&state, profile_id, query.search(), query.page_request()).await?;
    Ok(ApiResponse::ok(page, "Followers fetched successfully"))
}

async fn following(
    State(state): State<AppState>,
    Path(profile_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<ProfileSummary>>> {
    let page = social_graph::following(&state, profile_id, query.search(), query.page_request()).await?;
    Ok(ApiResponse::ok(page, "Following fetched successfully"))
}

pub fn follows_router() -> Router<AppState> {
    Router::new()
        .route("/toggle/{profile_id}", post(toggle_follow))
        .route("/followers/{profile_id}", get(followers))
        .route("/following/{profile_id}", get(following))
}

async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<ApiResponse<ToggleOutcome>> {
    Ok(toggled(social_graph::toggle_like(&state, &user, post_id).await?))
}

async fn user_liked(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageRequest>,
) -> AppResult<ApiResponse<Page<FeedPost>>> {
    let posts = feed::liked_posts(&state, user.id, page).await?;
    Ok(ApiResponse::ok(posts, "Liked posts fetched successfully"))
}

async fn like_count(State(state): State<AppState>, Path(post_id): Path<i64>) -> AppResult<ApiResponse<LikeCount>> {
    let likes_count = social_graph::post_like_count(&state, post_id).await?;
    Ok(ApiResponse::ok(
        LikeCount { post_id, likes_count },
        "Likes count fetched successfully",
    ))
}

async fn post_likers(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(post_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<ProfileSummary>>> {
    let page = social_graph::post_likers(&state, post_id, query.search(), query.page_request()).await?;
    Ok(ApiResponse::ok(page, "Likes fetched successfully"))
}

pub fn likes_router() -> Router<AppState> {
    Router::new()
        .route("/toggle/{post_id}", post(toggle_like))
        .route("/user-liked", get(user_liked))
        .route("/p/{post_id}", get(post_likers))
        .route("/p/likes/{post_id}", get(like_count))
}

async fn toggle_save(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<ApiResponse<ToggleOutcome>> {
    Ok(toggled(social_graph::toggle_save(&state, &user, post_id).await?))
}

async fn user_saveds(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageRequest>,
) -> AppResult<ApiResponse<Page<FeedPost>>> {
    let posts = feed::saved_posts(&state, user.id, page).await?;
    Ok(ApiResponse::ok(posts, "Saved posts fetched successfully"))
}

pub fn saved_router() -> Router<AppState> {
    Router::new()
        .route("/toggle/{post_id}", post(toggle_save))
        .route("/user-saveds", get(user_saveds))
}

async fn toggle_vote(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(contestant_id): Path<i64>,
) -> AppResult<ApiResponse<ToggleOutcome>> {
    Ok(toggled(social_graph::toggle_vote(&state, &user, contestant_id).await?))
}

async fn voters(
    State(state): State<AppState>,
    Path(contestant_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<ProfileSummary>>> {
    let page = social_graph::contestant_voters(&state, contestant_id, query.search(), query.page_request()).await?;
    Ok(ApiResponse::ok(page, "Voters fetched successfully"))
}

pub fn votes_router() -> Router<AppState> {
    Router::new()
        .route("/toggle/{contestant_id}", post(toggle_vote))
        .route("/{contestant_id}", get(voters))
}
