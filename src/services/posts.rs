use tracing::{info, instrument, warn};

use crate::app_state::AppState;
use crate::database::PostScope;
use crate::error::{AppError, AppResult};
use crate::infrastructure::media::{delete_all, upload_all, UploadFile};
use crate::models::{FeedPost, Page, PageRequest, PostRecord, PostStatus, UserRecord};

use super::feed::enrich;

pub const MAX_POST_MEDIA: usize = 3;

/// Who is asking to delete a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    User(i64),
    Admin(i64),
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[instrument(skip(state, owner, files), fields(owner_id = owner.id, file_count = files.len()))]
pub async fn create_post(
    state: &AppState,
    owner: &UserRecord,
    caption: Option<String>,
    location: Option<String>,
    files: Vec<UploadFile>,
) -> AppResult<PostRecord> {
    if !owner.is_contestant() {
        return Err(AppError::Forbidden("Only contestants can create posts".to_string()));
    }
    if files.is_empty() || files.len() > MAX_POST_MEDIA {
        return Err(AppError::BadRequest(format!(
            "A post needs between 1 and {} media files",
            MAX_POST_MEDIA
        )));
    }
    for file in &files {
        file.resource_type()?;
    }

    let media = upload_all(state.media.as_ref(), files)
        .await
        .map_err(|e| AppError::ExternalService(format!("Failed to upload post media: {}", e)))?;

    let caption = clean(caption);
    let location = clean(location);
    match state
        .db
        .insert_post(owner.id, caption.as_deref(), location.as_deref(), &media)
        .await
    {
        Ok(post) => {
            info!(post_id = post.id, "Post created, awaiting moderation");
            Ok(post)
        }
        Err(err) => {
            warn!("Post insert failed, removing uploaded media");
            delete_all(state.media.as_ref(), &media).await;
            Err(err)
        }
    }
}

#[instrument(skip(state, owner), fields(owner_id = owner.id))]
pub async fn edit_post(
    state: &AppState,
    owner: &UserRecord,
    post_id: i64,
    caption: Option<String>,
    location: Option<String>,
) -> AppResult<PostRecord> {
    let post = state.db.get_post(post_id).await?;
    if post.owner_id != owner.id {
        return Err(AppError::Forbidden("You can only edit your own posts".to_string()));
    }
    state
        .db
        .update_post_details(post_id, clean(caption).as_deref(), clean(location).as_deref())
        .await
}

/// Owners delete their own posts; admins delete any. Remote media goes after
/// the rows.
#[instrument(skip(state))]
pub async fn delete_post(state: &AppState, requester: Requester, post_id: i64) -> AppResult<()> {
    let post = state.db.get_post(post_id).await?;
    if let Requester::User(user_id) = requester {
        if post.owner_id != user_id {
            return Err(AppError::Forbidden("You can only delete your own posts".to_string()));
        }
    }

    let deleted = state.db.delete_post(post_id).await?;
    let failures = delete_all(state.media.as_ref(), &deleted.media.0).await;
    info!(post_id, media_failures = failures, "Post deleted");
    Ok(())
}

pub async fn moderation_queue(state: &AppState, status: PostStatus, page: PageRequest) -> AppResult<Page<FeedPost>> {
    let rows = state.db.list_posts(PostScope::Status(status), page).await?;
    enrich(state, None, rows).await
}

#[instrument(skip(state))]
pub async fn set_status(state: &AppState, post_id: i64, status: PostStatus) -> AppResult<PostRecord> {
    let post = state.db.set_post_status(post_id, status).await?;
    info!(status = ?status, "Post moderated");
    Ok(post)
}
