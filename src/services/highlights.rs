use tracing::{info, instrument, warn};

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::infrastructure::media::UploadFile;
use crate::models::{HighlightRecord, HighlightView, MediaAsset, UserRecord};

use super::feed::post_by_id;

fn require_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title is required".to_string()));
    }
    Ok(title.to_string())
}

async fn upload_cover(state: &AppState, cover: UploadFile) -> AppResult<MediaAsset> {
    if cover.resource_type()? != "image" {
        return Err(AppError::BadRequest("Highlight cover must be an image".to_string()));
    }
    state
        .media
        .upload(cover)
        .await
        .map_err(|e| AppError::ExternalService(format!("Failed to upload highlight cover: {}", e)))
}

async fn owned_highlight(state: &AppState, owner: &UserRecord, highlight_id: i64) -> AppResult<HighlightRecord> {
    let highlight = state.db.get_highlight(highlight_id).await?;
    if highlight.owner_id != owner.id {
        return Err(AppError::Forbidden("You can only manage your own highlights".to_string()));
    }
    Ok(highlight)
}

async fn discard_cover(state: &AppState, cover: &MediaAsset) {
    if let Err(err) = state.media.delete(cover).await {
        warn!(public_id = %cover.public_id, "Failed to delete highlight cover: {}", err);
    }
}

#[instrument(skip(state, owner, cover), fields(owner_id = owner.id))]
pub async fn create_highlight(
    state: &AppState,
    owner: &UserRecord,
    title: &str,
    post_id: Option<i64>,
    cover: Option<UploadFile>,
) -> AppResult<HighlightView> {
    let title = require_title(title)?;
    let cover = cover.ok_or_else(|| AppError::Validation("cover image is required".to_string()))?;
    if let Some(post_id) = post_id {
        state.db.get_post(post_id).await?;
    }

    let cover = upload_cover(state, cover).await?;
    match state.db.insert_highlight(owner.id, &title, &cover, post_id).await {
        Ok(highlight) => {
            info!(highlight_id = highlight.id, "Highlight created");
            Ok(HighlightView::from(highlight))
        }
        Err(err) => {
            discard_cover(state, &cover).await;
            Err(err)
        }
    }
}

/// Rename, and when a new cover comes along, swap it and drop the old one.
#[instrument(skip(state, owner, cover), fields(owner_id = owner.id))]
pub async fn edit_highlight(
    state: &AppState,
    owner: &UserRecord,
    highlight_id: i64,
    title: &str,
    cover: Option<UploadFile>,
) -> AppResult<HighlightView> {
    let title = require_title(title)?;
    let existing = owned_highlight(state, owner, highlight_id).await?;

    let new_cover = match cover {
        Some(file) => Some(upload_cover(state, file).await?),
        None => None,
    };
    let updated = match state.db.update_highlight(highlight_id, &title, new_cover.as_ref()).await {
        Ok(updated) => updated,
        Err(err) => {
            if let Some(cover) = &new_cover {
                discard_cover(state, cover).await;
            }
            return Err(err);
        }
    };
    if new_cover.is_some() {
        discard_cover(state, &existing.cover()).await;
    }
    Ok(HighlightView::from(updated))
}

#[instrument(skip(state, owner), fields(owner_id = owner.id))]
pub async fn delete_highlight(state: &AppState, owner: &UserRecord, highlight_id: i64) -> AppResult<()> {
    let highlight = owned_highlight(state, owner, highlight_id).await?;
    state.db.delete_highlight(highlight.id).await?;
    discard_cover(state, &highlight.cover()).await;
    info!("Highlight deleted");
    Ok(())
}

pub async fn my_highlights(state: &AppState, owner: &UserRecord) -> AppResult<Vec<HighlightView>> {
    Ok(state
        .db
        .list_highlights_for_owner(owner.id)
        .await?
        .into_iter()
        .map(HighlightView::from)
        .collect())
}

/// A highlight with its linked post, when that post is still visible.
pub async fn highlight_by_id(state: &AppState, viewer_id: Option<i64>, highlight_id: i64) -> AppResult<HighlightView> {
    let highlight = state.db.get_highlight(highlight_id).await?;
    let post = match highlight.post_id {
        Some(post_id) => match post_by_id(state, viewer_id, post_id).await {
            Ok(post) => Some(post),
            Err(AppError::NotFound(_)) => None,
            Err(err) => return Err(err),
        },
        None => None,
    };
    Ok(HighlightView::new(highlight, post))
}
