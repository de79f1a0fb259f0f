use sqlx::types::Json;

use super::Database;
use crate::error::{AppError, AppResult};
use crate::models::advertisement::AdSchedule;
use crate::models::{current_time_millis, AdKind, AdPlacement, AdvertisementRecord, MediaAsset, Page, PageRequest};

#[derive(Debug, Clone)]
pub struct NewAdvertisement {
    pub kind: AdKind,
    pub contestant_id: Option<i64>,
    pub placement: Option<AdPlacement>,
    pub images: Vec<MediaAsset>,
    pub schedule: AdSchedule,
    pub hyperlink: String,
}

impl Database {
    pub async fn insert_advertisement(&self, ad: NewAdvertisement) -> AppResult<AdvertisementRecord> {
        let id = self.next_id();
        let now = current_time_millis();
        sqlx::query(
            r#"
            INSERT INTO advertisements (id, kind, contestant_id, placement, images, start_at, end_at,
                duration_seconds, hyperlink, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(id)
        .bind(ad.kind)
        .bind(ad.contestant_id)
        .bind(ad.placement)
        .bind(Json(&ad.images))
        .bind(ad.schedule.start.timestamp_millis())
        .bind(ad.schedule.end.timestamp_millis())
        .bind(ad.schedule.duration_seconds())
        .bind(&ad.hyperlink)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_advertisement(id).await
    }

    pub async fn find_advertisement(&self, id: i64) -> AppResult<Option<AdvertisementRecord>> {
        let ad = sqlx::query_as::<_, AdvertisementRecord>("SELECT * FROM advertisements WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(ad)
    }

    pub async fn get_advertisement(&self, id: i64) -> AppResult<AdvertisementRecord> {
        self.find_advertisement(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Advertisement not found".to_string()))
    }

    pub async fn update_advertisement(
        &self,
        id: i64,
        schedule: AdSchedule,
        hyperlink: &str,
    ) -> AppResult<AdvertisementRecord> {
        let result = sqlx::query(
            "UPDATE advertisements SET start_at = ?, end_at = ?, duration_seconds = ?, hyperlink = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(schedule.start.timestamp_millis())
        .bind(schedule.end.timestamp_millis())
        .bind(schedule.duration_seconds())
        .bind(hyperlink)
        .bind(current_time_millis())
        .bind(id)
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Advertisement not found".to_string()));
        }
        self.get_advertisement(id).await
    }

    pub async fn delete_advertisement(&self, id: i64) -> AppResult<AdvertisementRecord> {
        let ad = self.get_advertisement(id).await?;
        sqlx::query("DELETE FROM advertisements WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(ad)
    }

    /// Flip `is_active`. Activating a global ad deactivates every other global
    /// ad in the same transaction.
    pub async fn toggle_advertisement(&self, id: i64) -> AppResult<AdvertisementRecord> {
        let mut tx = self.begin().await?;
        let now = current_time_millis();

        let ad = sqlx::query_as::<_, AdvertisementRecord>("SELECT * FROM advertisements WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Advertisement not found".to_string()))?;

        let activate = !ad.is_active;
        if activate && ad.kind == AdKind::Global {
            sqlx::query(
                "UPDATE advertisements SET is_active = 0, updated_at = ? WHERE kind = 'global' AND is_active = 1 AND id != ?",
            )
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE advertisements SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(activate)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.get_advertisement(id).await
    }

    /// Active first, then newest.
    pub async fn list_advertisements(&self, page: PageRequest) -> AppResult<Page<AdvertisementRecord>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM advertisements")
            .fetch_one(self.pool())
            .await?;
        let docs = sqlx::query_as::<_, AdvertisementRecord>(
            "SELECT * FROM advertisements ORDER BY is_active DESC, created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;
        Ok(Page::new(docs, total, page))
    }

    /// Active individual ads of a contestant whose window contains `now`.
    pub async fn live_ads_for_contestant(&self, contestant_id: i64, now: i64) -> AppResult<Vec<AdvertisementRecord>> {
        let ads = sqlx::query_as::<_, AdvertisementRecord>(
            r#"
            SELECT * FROM advertisements
            WHERE kind = 'individual' AND contestant_id = ? AND is_active = 1
                AND start_at <= ? AND end_at > ?
            ORDER BY placement ASC, created_at DESC
            "#,
        )
        .bind(contestant_id)
        .bind(now)
        .bind(now)
        .fetch_all(self.pool())
        .await?;
        Ok(ads)
    }

    pub async fn active_global_ad(&self) -> AppResult<Option<AdvertisementRecord>> {
        let ad = sqlx::query_as::<_, AdvertisementRecord>(
            "SELECT * FROM advertisements WHERE kind = 'global' AND is_active = 1 ORDER BY updated_at DESC LIMIT 1",
        )
        .fetch_optional(self.pool())
        .await?;
        Ok(ad)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    pub(crate) fn global_ad() -> NewAdvertisement {
        let start = Utc::now() - Duration::hours(1);
        NewAdvertisement {
            kind: AdKind::Global,
            contestant_id: None,
            placement: None,
            images: vec![MediaAsset {
                url: "https://media.test/ad.jpg".to_string(),
                public_id: "ad".to_string(),
                resource_type: "image".to_string(),
            }],
            schedule: AdSchedule {
                start,
                end: start + Duration::days(1),
            },
            hyperlink: "https://sponsor.test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_single_active_global_ad() {
        let db = Database::new_in_memory().await.unwrap();
        let first = db.insert_advertisement(global_ad()).await.unwrap();
        let second = db.insert_advertisement(global_ad()).await.unwrap();
        assert!(!first.is_active);
        assert_eq!(first.duration_seconds, 86_400);

        assert!(db.toggle_advertisement(first.id).await.unwrap().is_active);
        assert!(db.toggle_advertisement(second.id).await.unwrap().is_active);
        assert!(!db.get_advertisement(first.id).await.unwrap().is_active);

        let active: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM advertisements WHERE kind = 'global' AND is_active = 1")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(active, 1);
        assert_eq!(db.active_global_ad().await.unwrap().unwrap().id, second.id);

        let page = db.list_advertisements(PageRequest::default()).await.unwrap();
        assert_eq!(page.docs[0].id, second.id);

        assert!(!db.toggle_advertisement(second.id).await.unwrap().is_active);
    }
}
