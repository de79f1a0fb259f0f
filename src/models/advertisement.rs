use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use super::{millis_to_datetime, MediaAsset};

pub const MAX_AD_IMAGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AdKind {
    Global,
    Individual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AdPlacement {
    Primary,
    Secondary,
}

impl FromStr for AdKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(AdKind::Global),
            "individual" => Ok(AdKind::Individual),
            other => Err(format!("unknown advertisement type '{}'", other)),
        }
    }
}

impl FromStr for AdPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(AdPlacement::Primary),
            "secondary" => Ok(AdPlacement::Secondary),
            other => Err(format!("unknown placement '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AdvertisementRecord {
    pub id: i64,
    pub kind: AdKind,
    pub contestant_id: Option<i64>,
    pub placement: Option<AdPlacement>,
    pub images: Json<Vec<MediaAsset>>,
    pub start_at: i64,
    pub end_at: i64,
    pub duration_seconds: i64,
    pub hyperlink: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisementView {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: AdKind,
    pub contestant_id: Option<i64>,
    pub placement: Option<AdPlacement>,
    pub images: Vec<MediaAsset>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_in_seconds: i64,
    pub hyperlink: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AdvertisementRecord> for AdvertisementView {
    fn from(ad: AdvertisementRecord) -> Self {
        Self {
            id: ad.id,
            kind: ad.kind,
            contestant_id: ad.contestant_id,
            placement: ad.placement,
            images: ad.images.0,
            start_at: millis_to_datetime(ad.start_at),
            end_at: millis_to_datetime(ad.end_at),
            duration_in_seconds: ad.duration_seconds,
            hyperlink: ad.hyperlink,
            is_active: ad.is_active,
            created_at: millis_to_datetime(ad.created_at),
            updated_at: millis_to_datetime(ad.updated_at),
        }
    }
}

/// Campaign window derived from separate date and time-of-day inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdSchedule {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AdSchedule {
    pub fn from_parts(
        start_date: NaiveDate,
        start_time: NaiveTime,
        end_date: NaiveDate,
        end_time: NaiveTime,
    ) -> Option<Self> {
        let start = start_date.and_time(start_time).and_utc();
        let end = end_date.and_time(end_time).and_utc();
        (end > start).then_some(Self { start, end })
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_duration() {
        let schedule = AdSchedule::from_parts(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
        )
        .unwrap();
        assert_eq!(schedule.duration_seconds(), 24 * 3600 + 1800);
    }

    #[test]
    fn test_schedule_rejects_inverted_window() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        assert!(AdSchedule::from_parts(day, noon, day, noon).is_none());
        assert!(AdSchedule::from_parts(
            day,
            noon,
            day,
            NaiveTime::from_hms_opt(11, 0, 0).unwrap()
        )
        .is_none());
    }
}
