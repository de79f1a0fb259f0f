// Follow, like, save and vote toggles and the profile lists built on them.

use tracing::{info, instrument, warn};

use crate::app_state::AppState;
use crate::database::EdgeEnd;
use crate::error::{AppError, AppResult};
use crate::models::notification::notification_link;
use crate::models::{
    EdgeKind, NotificationKind, Page, PageRequest, ProfileSummary, ToggleAction, ToggleOutcome, UserRecord,
};

async fn require_active_user(state: &AppState, id: i64) -> AppResult<UserRecord> {
    state
        .db
        .find_user(id)
        .await?
        .filter(UserRecord::is_active)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Write the notification for a fresh edge. The edge is already committed, so
/// a failure here is logged rather than surfaced.
async fn notify(state: &AppState, recipient_id: i64, sender: &UserRecord, kind: NotificationKind, post_id: Option<i64>) {
    if recipient_id == sender.id {
        return;
    }
    let link = notification_link(&state.config.server.public_app_url, kind, post_id, &sender.username);
    if let Err(err) = state
        .db
        .insert_notification(recipient_id, sender.id, kind, post_id, &link)
        .await
    {
        warn!(recipient_id, sender_id = sender.id, "Failed to write notification: {}", err);
    }
}

async fn toggle(state: &AppState, kind: EdgeKind, actor: &UserRecord, target_id: i64) -> AppResult<ToggleOutcome> {
    let action = state.db.toggle_edge(kind, actor.id, target_id).await?;
    info!(
        kind = kind.as_str(),
        actor_id = actor.id,
        target_id,
        action = ?action,
        "Edge toggled"
    );
    Ok(ToggleOutcome::new(kind, action))
}

#[instrument(skip(state, actor), fields(actor_id = actor.id))]
pub async fn toggle_follow(state: &AppState, actor: &UserRecord, profile_id: i64) -> AppResult<ToggleOutcome> {
    if actor.id == profile_id {
        return Err(AppError::BadRequest("You cannot follow yourself".to_string()));
    }
    require_active_user(state, profile_id).await?;

    let outcome = toggle(state, EdgeKind::Follow, actor, profile_id).await?;
    if outcome.action == ToggleAction::Do {
        notify(state, profile_id, actor, NotificationKind::Follow, None).await;
    }
    Ok(outcome)
}

#[instrument(skip(state, actor), fields(actor_id = actor.id))]
pub async fn toggle_like(state: &AppState, actor: &UserRecord, post_id: i64) -> AppResult<ToggleOutcome> {
    let post = state.db.get_post(post_id).await?;

    let outcome = toggle(state, EdgeKind::Like, actor, post_id).await?;
    if outcome.action == ToggleAction::Do {
        notify(state, post.owner_id, actor, NotificationKind::Like, Some(post_id)).await;
    }
    Ok(outcome)
}

#[instrument(skip(state, actor), fields(actor_id = actor.id))]
pub async fn toggle_save(state: &AppState, actor: &UserRecord, post_id: i64) -> AppResult<ToggleOutcome> {
    state.db.get_post(post_id).await?;
    toggle(state, EdgeKind::Save, actor, post_id).await
}

#[instrument(skip(state, actor), fields(actor_id = actor.id))]
pub async fn toggle_vote(state: &AppState, actor: &UserRecord, contestant_id: i64) -> AppResult<ToggleOutcome> {
    if actor.id == contestant_id {
        return Err(AppError::BadRequest("You cannot vote for yourself".to_string()));
    }
    let contestant = state
        .db
        .find_user(contestant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Contestant not found".to_string()))?;
    // Withdrawing a vote stays possible after the contestant is suspended.
    let withdrawing = state.db.edge_exists(EdgeKind::Vote, actor.id, contestant_id).await?;
    if !withdrawing && (!contestant.is_contestant() || !contestant.is_active()) {
        return Err(AppError::BadRequest("Votes can only go to active contestants".to_string()));
    }

    let outcome = toggle(state, EdgeKind::Vote, actor, contestant_id).await?;
    if outcome.action == ToggleAction::Do {
        notify(state, contestant_id, actor, NotificationKind::Vote, None).await;
    }
    Ok(outcome)
}

pub async fn followers(
    state: &AppState,
    profile_id: i64,
    query: Option<&str>,
    page: PageRequest,
) -> AppResult<Page<ProfileSummary>> {
    require_active_user(state, profile_id).await?;
    state
        .db
        .list_edge_profiles(EdgeKind::Follow, EdgeEnd::Target, profile_id, query, page)
        .await
}

pub async fn following(
    state: &AppState,
    profile_id: i64,
    query: Option<&str>,
    page: PageRequest,
) -> AppResult<Page<ProfileSummary>> {
    require_active_user(state, profile_id).await?;
    state
        .db
        .list_edge_profiles(EdgeKind::Follow, EdgeEnd::Actor, profile_id, query, page)
        .await
}

pub async fn post_likers(
    state: &AppState,
    post_id: i64,
    query: Option<&str>,
    page: PageRequest,
) -> AppResult<Page<ProfileSummary>> {
    state.db.get_post(post_id).await?;
    state
        .db
        .list_edge_profiles(EdgeKind::Like, EdgeEnd::Target, post_id, query, page)
        .await
}

pub async fn post_like_count(state: &AppState, post_id: i64) -> AppResult<i64> {
    state.db.get_post(post_id).await?;
    state.db.count_edges(EdgeKind::Like, EdgeEnd::Target, post_id).await
}

pub async fn contestant_voters(
    state: &AppState,
    contestant_id: i64,
    query: Option<&str>,
    page: PageRequest,
) -> AppResult<Page<ProfileSummary>> {
    let contestant = require_active_user(state, contestant_id).await?;
    if !contestant.is_contestant() {
        return Err(AppError::NotFound("Contestant not found".to_string()));
    }
    state
        .db
        .list_edge_profiles(EdgeKind::Vote, EdgeEnd::Target, contestant_id, query, page)
        .await
}
