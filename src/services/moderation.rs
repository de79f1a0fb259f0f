// Admin-side operations: contestant status and removal, advertisement lifecycle.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::app_state::AppState;
use crate::database::{CascadeReport, ContestantFilters, ContestantSummary, NewAdvertisement};
use crate::error::{AppError, AppResult};
use crate::infrastructure::media::{delete_all, upload_all, UploadFile};
use crate::models::advertisement::{AdSchedule, MAX_AD_IMAGES};
use crate::models::{AdKind, AdPlacement, AdvertisementView, Page, PageRequest, UserStatus};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    pub start_date: String,
    pub start_time: String,
    pub end_date: String,
    pub end_time: String,
}

impl ScheduleInput {
    pub fn parse(&self) -> AppResult<AdSchedule> {
        let start_date = parse_date(&self.start_date)?;
        let end_date = parse_date(&self.end_date)?;
        let start_time = parse_time(&self.start_time)?;
        let end_time = parse_time(&self.end_time)?;
        AdSchedule::from_parts(start_date, start_time, end_date, end_time)
            .ok_or_else(|| AppError::Validation("End date must be after the start date".to_string()))
    }
}

fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

fn parse_time(raw: &str) -> AppResult<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| AppError::Validation(format!("Invalid time '{}', expected HH:MM", raw)))
}

#[derive(Debug, Clone)]
pub struct AdvertisementInput {
    pub kind: AdKind,
    pub contestant_id: Option<i64>,
    pub placement: Option<AdPlacement>,
    pub schedule: ScheduleInput,
    pub hyperlink: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisementEdit {
    #[serde(flatten)]
    pub schedule: ScheduleInput,
    pub hyperlink: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestantStatusChange {
    pub contestant_id: i64,
    pub status: UserStatus,
}

pub async fn contestants(
    state: &AppState,
    mut filters: ContestantFilters,
    page: PageRequest,
) -> AppResult<Page<ContestantSummary>> {
    filters.include_suspended = true;
    state.db.list_contestants(&filters, page).await
}

/// Flip a contestant between active and suspended.
#[instrument(skip(state))]
pub async fn toggle_contestant_status(state: &AppState, contestant_id: i64) -> AppResult<ContestantStatusChange> {
    let contestant = state
        .db
        .find_user(contestant_id)
        .await?
        .filter(|u| u.is_contestant())
        .ok_or_else(|| AppError::NotFound("Contestant not found".to_string()))?;

    let status = match contestant.status {
        UserStatus::Active => UserStatus::Suspended,
        UserStatus::Suspended => UserStatus::Active,
    };
    state.db.set_user_status(contestant_id, status).await?;
    info!(status = ?status, "Contestant status changed");
    Ok(ContestantStatusChange { contestant_id, status })
}

/// Remove a contestant and everything referencing them, then clean up their
/// remote media.
#[instrument(skip(state))]
pub async fn delete_contestant(state: &AppState, contestant_id: i64) -> AppResult<CascadeReport> {
    let contestant = state
        .db
        .find_user(contestant_id)
        .await?
        .filter(|u| u.is_contestant())
        .ok_or_else(|| AppError::NotFound("Contestant not found".to_string()))?;

    let report = state.db.delete_user_cascade(contestant.id).await?;
    let failures = delete_all(state.media.as_ref(), &report.media).await;
    if failures > 0 {
        warn!(failures, "Some remote media of the deleted contestant was not removed");
    }
    info!(
        posts = report.posts,
        votes = report.votes,
        follows = report.follows,
        "Contestant deleted"
    );
    Ok(report)
}

#[instrument(skip(state, input, files), fields(kind = ?input.kind))]
pub async fn create_advertisement(
    state: &AppState,
    input: AdvertisementInput,
    files: Vec<UploadFile>,
) -> AppResult<AdvertisementView> {
    if files.is_empty() || files.len() > MAX_AD_IMAGES {
        return Err(AppError::BadRequest(format!(
            "An advertisement needs between 1 and {} images",
            MAX_AD_IMAGES
        )));
    }
    for file in &files {
        if file.resource_type()? != "image" {
            return Err(AppError::BadRequest("Advertisement images must be images".to_string()));
        }
    }
    let hyperlink = input.hyperlink.trim().to_string();
    if hyperlink.is_empty() {
        return Err(AppError::Validation("hyperlink is required".to_string()));
    }
    let schedule = input.schedule.parse()?;

    let (contestant_id, placement) = match input.kind {
        AdKind::Global => (None, None),
        AdKind::Individual => {
            let contestant_id = input
                .contestant_id
                .ok_or_else(|| AppError::Validation("contestantId is required for individual ads".to_string()))?;
            let placement = input.placement.ok_or_else(|| {
                AppError::Validation("Placement must be primary or secondary for individual ads".to_string())
            })?;
            state
                .db
                .find_user(contestant_id)
                .await?
                .filter(|u| u.is_contestant())
                .ok_or_else(|| AppError::NotFound("Contestant not found".to_string()))?;
            (Some(contestant_id), Some(placement))
        }
    };

    let images = upload_all(state.media.as_ref(), files)
        .await
        .map_err(|e| AppError::ExternalService(format!("Failed to upload advertisement images: {}", e)))?;

    let new_ad = NewAdvertisement {
        kind: input.kind,
        contestant_id,
        placement,
        images: images.clone(),
        schedule,
        hyperlink,
    };
    match state.db.insert_advertisement(new_ad).await {
        Ok(ad) => {
            info!(ad_id = ad.id, "Advertisement created");
            Ok(AdvertisementView::from(ad))
        }
        Err(err) => {
            delete_all(state.media.as_ref(), &images).await;
            Err(err)
        }
    }
}

pub async fn edit_advertisement(state: &AppState, ad_id: i64, edit: AdvertisementEdit) -> AppResult<AdvertisementView> {
    let hyperlink = edit.hyperlink.trim();
    if hyperlink.is_empty() {
        return Err(AppError::Validation("hyperlink is required".to_string()));
    }
    let schedule = edit.schedule.parse()?;
    let ad = state.db.update_advertisement(ad_id, schedule, hyperlink).await?;
    Ok(AdvertisementView::from(ad))
}

#[instrument(skip(state))]
pub async fn delete_advertisement(state: &AppState, ad_id: i64) -> AppResult<()> {
    let ad = state.db.delete_advertisement(ad_id).await?;
    delete_all(state.media.as_ref(), &ad.images.0).await;
    info!("Advertisement deleted");
    Ok(())
}

#[instrument(skip(state))]
pub async fn toggle_advertisement(state: &AppState, ad_id: i64) -> AppResult<AdvertisementView> {
    let ad = state.db.toggle_advertisement(ad_id).await?;
    info!(active = ad.is_active, "Advertisement toggled");
    Ok(AdvertisementView::from(ad))
}

pub async fn advertisements(state: &AppState, page: PageRequest) -> AppResult<Page<AdvertisementView>> {
    Ok(state.db.list_advertisements(page).await?.map(AdvertisementView::from))
}
