use axum::{
    extract::State,
    routing::{delete, get, patch, post},
    Router,
};

use super::extract::Path;
use super::multipart::MultipartForm;
use super::response::ApiResponse;
use crate::app_state::AppState;
use crate::error::AppResult;
use crate::infrastructure::middleware::CurrentUser;
use crate::models::HighlightView;
use crate::services::highlights;

async fn create_highlight(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut form: MultipartForm,
) -> AppResult<ApiResponse<HighlightView>> {
    let title = form.required_text("title")?;
    let post_id = form.parse::<i64>("postId")?;
    let cover = form.take_file("cover");
    let highlight = highlights::create_highlight(&state, &user, &title, post_id, cover).await?;
    Ok(ApiResponse::created(highlight, "Highlight created successfully"))
}

async fn edit_highlight(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(highlight_id): Path<i64>,
    mut form: MultipartForm,
) -> AppResult<ApiResponse<HighlightView>> {
    let title = form.required_text("title")?;
    let cover = form.take_file("cover");
    let highlight = highlights::edit_highlight(&state, &user, highlight_id, &title, cover).await?;
    Ok(ApiResponse::ok(highlight, "Highlight updated successfully"))
}

async fn delete_highlight(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(highlight_id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    highlights::delete_highlight(&state, &user, highlight_id).await?;
    Ok(ApiResponse::ok((), "Highlight deleted successfully"))
}

async fn my_highlights(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<Vec<HighlightView>>> {
    let list = highlights::my_highlights(&state, &user).await?;
    Ok(ApiResponse::ok(list, "Highlights fetched successfully"))
}

async fn highlight_by_id(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(highlight_id): Path<i64>,
) -> AppResult<ApiResponse<HighlightView>> {
    let viewer_id = viewer.map(|CurrentUser(v)| v.id);
    let highlight = highlights::highlight_by_id(&state, viewer_id, highlight_id).await?;
    Ok(ApiResponse::ok(highlight, "Highlight fetched successfully"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(my_highlights))
        .route("/create", post(create_highlight))
        .route("/{highlight_id}", get(highlight_by_id))
        .route("/{highlight_id}/edit", patch(edit_highlight))
        .route("/{highlight_id}/delete", delete(delete_highlight))
}
