// Read-side views: feeds, post pages, profile info and contestant listings.
// Every post view goes through `enrich`, which joins the social graph onto
// the page in three set-membership lookups.

use std::collections::HashSet;

use serde::Serialize;
use tracing::instrument;

use crate::app_state::AppState;
use crate::database::{ContestantFilters, ContestantSummary, EdgeEnd, FilterOptions, PostScope};
use crate::error::{AppError, AppResult};
use crate::models::{
    current_time_millis, AdvertisementView, EdgeKind, FeedPost, Page, PageRequest, PostRecord, ProfileSummary,
    UserView,
};

/// Owner projection, like count and viewer flags for each post. Without a
/// viewer every flag is false.
pub async fn enrich(
    state: &AppState,
    viewer_id: Option<i64>,
    page: Page<(PostRecord, ProfileSummary)>,
) -> AppResult<Page<FeedPost>> {
    let post_ids: Vec<i64> = page.docs.iter().map(|(post, _)| post.id).collect();
    let mut owner_ids: Vec<i64> = page.docs.iter().map(|(post, _)| post.owner_id).collect();
    owner_ids.sort_unstable();
    owner_ids.dedup();

    let like_counts = state.db.like_counts(&post_ids).await?;
    let (liked, saved, following) = match viewer_id {
        Some(viewer_id) => (
            state.db.edge_targets_among(EdgeKind::Like, viewer_id, &post_ids).await?,
            state.db.edge_targets_among(EdgeKind::Save, viewer_id, &post_ids).await?,
            state.db.edge_targets_among(EdgeKind::Follow, viewer_id, &owner_ids).await?,
        ),
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    Ok(page.map(|(post, owner)| {
        let id = post.id;
        let owner_id = post.owner_id;
        let mut view = FeedPost::new(post, owner);
        view.likes_count = like_counts.get(&id).copied().unwrap_or(0);
        view.is_liked = liked.contains(&id);
        view.is_saved = saved.contains(&id);
        view.is_following = following.contains(&owner_id);
        view
    }))
}

async fn posts_in_scope(
    state: &AppState,
    viewer_id: Option<i64>,
    scope: PostScope,
    page: PageRequest,
) -> AppResult<Page<FeedPost>> {
    let rows = state.db.list_posts(scope, page).await?;
    enrich(state, viewer_id, rows).await
}

/// Posts of the accounts the viewer follows, newest first.
#[instrument(skip(state))]
pub async fn user_feed(state: &AppState, viewer_id: i64, page: PageRequest) -> AppResult<Page<FeedPost>> {
    posts_in_scope(state, Some(viewer_id), PostScope::FollowedBy(viewer_id), page).await
}

pub async fn guest_feed(state: &AppState, page: PageRequest) -> AppResult<Page<FeedPost>> {
    posts_in_scope(state, None, PostScope::Visible, page).await
}

pub async fn more_posts_of_user(
    state: &AppState,
    viewer_id: Option<i64>,
    owner_id: i64,
    page: PageRequest,
) -> AppResult<Page<FeedPost>> {
    posts_in_scope(state, viewer_id, PostScope::Owner(owner_id), page).await
}

pub async fn liked_posts(state: &AppState, user_id: i64, page: PageRequest) -> AppResult<Page<FeedPost>> {
    posts_in_scope(state, Some(user_id), PostScope::LikedBy(user_id), page).await
}

pub async fn saved_posts(state: &AppState, user_id: i64, page: PageRequest) -> AppResult<Page<FeedPost>> {
    posts_in_scope(state, Some(user_id), PostScope::SavedBy(user_id), page).await
}

pub async fn post_by_id(state: &AppState, viewer_id: Option<i64>, post_id: i64) -> AppResult<FeedPost> {
    let row = state
        .db
        .find_visible_post_with_owner(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    let page = enrich(state, viewer_id, Page::new(vec![row], 1, PageRequest::new(1, 1))).await?;
    page.docs
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInfo {
    #[serde(flatten)]
    pub user: UserView,
    pub followers_count: i64,
    pub following_count: i64,
    pub votes_count: i64,
    pub is_following: bool,
    pub is_voted: bool,
    pub advertisements: Vec<AdvertisementView>,
    pub global_advertisement: Option<AdvertisementView>,
}

#[instrument(skip(state))]
pub async fn profile_info(state: &AppState, viewer_id: Option<i64>, username: &str) -> AppResult<ProfileInfo> {
    let user = state
        .db
        .find_active_user_by_username(username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let followers_count = state.db.count_edges(EdgeKind::Follow, EdgeEnd::Target, user.id).await?;
    let following_count = state.db.count_edges(EdgeKind::Follow, EdgeEnd::Actor, user.id).await?;
    let votes_count = state.db.count_edges(EdgeKind::Vote, EdgeEnd::Target, user.id).await?;

    let (is_following, is_voted) = match viewer_id {
        Some(viewer_id) if viewer_id != user.id => (
            state.db.edge_exists(EdgeKind::Follow, viewer_id, user.id).await?,
            state.db.edge_exists(EdgeKind::Vote, viewer_id, user.id).await?,
        ),
        _ => (false, false),
    };

    let advertisements = if user.is_contestant() {
        state
            .db
            .live_ads_for_contestant(user.id, current_time_millis())
            .await?
            .into_iter()
            .map(AdvertisementView::from)
            .collect()
    } else {
        Vec::new()
    };
    let global_advertisement = state.db.active_global_ad().await?.map(AdvertisementView::from);

    Ok(ProfileInfo {
        user: UserView::from(user),
        followers_count,
        following_count,
        votes_count,
        is_following,
        is_voted,
        advertisements,
        global_advertisement,
    })
}

pub async fn contestants(
    state: &AppState,
    filters: &ContestantFilters,
    page: PageRequest,
) -> AppResult<Page<ContestantSummary>> {
    state.db.list_contestants(filters, page).await
}

pub async fn contestant_filter_options(state: &AppState) -> AppResult<FilterOptions> {
    state.db.contestant_filter_options().await
}
