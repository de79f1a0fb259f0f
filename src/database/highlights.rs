use super::Database;
use crate::error::{AppError, AppResult};
use crate::models::{current_time_millis, HighlightRecord, MediaAsset};

impl Database {
    pub async fn insert_highlight(
        &self,
        owner_id: i64,
        title: &str,
        cover: &MediaAsset,
        post_id: Option<i64>,
    ) -> AppResult<HighlightRecord> {
        let record = HighlightRecord {
            id: self.next_id(),
            owner_id,
            title: title.to_string(),
            cover_url: cover.url.clone(),
            cover_public_id: cover.public_id.clone(),
            post_id,
            created_at: current_time_millis(),
        };
        sqlx::query(
            "INSERT INTO highlights (id, owner_id, title, cover_url, cover_public_id, post_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id)
        .bind(record.owner_id)
        .bind(&record.title)
        .bind(&record.cover_url)
        .bind(&record.cover_public_id)
        .bind(record.post_id)
        .bind(record.created_at)
        .execute(self.pool())
        .await?;
        Ok(record)
    }

    pub async fn find_highlight(&self, id: i64) -> AppResult<Option<HighlightRecord>> {
        let record = sqlx::query_as::<_, HighlightRecord>("SELECT * FROM highlights WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(record)
    }

    pub async fn get_highlight(&self, id: i64) -> AppResult<HighlightRecord> {
        self.find_highlight(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Highlight not found".to_string()))
    }

    pub async fn list_highlights_for_owner(&self, owner_id: i64) -> AppResult<Vec<HighlightRecord>> {
        let records = sqlx::query_as::<_, HighlightRecord>(
            "SELECT * FROM highlights WHERE owner_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(owner_id)
        .fetch_all(self.pool())
        .await?;
        Ok(records)
    }

    /// Update the title and, when given, swap the cover.
    pub async fn update_highlight(
        &self,
        id: i64,
        title: &str,
        cover: Option<&MediaAsset>,
    ) -> AppResult<HighlightRecord> {
        match cover {
            Some(cover) => {
                sqlx::query("UPDATE highlights SET title = ?, cover_url = ?, cover_public_id = ? WHERE id = ?")
                    .bind(title)
                    .bind(&cover.url)
                    .bind(&cover.public_id)
                    .bind(id)
                    .execute(self.pool())
                    .await?;
            }
            None => {
                sqlx::query("UPDATE highlights SET title = ? WHERE id = ?")
                    .bind(title)
                    .bind(id)
                    .execute(self.pool())
                    .await?;
            }
        }
        self.get_highlight(id).await
    }

    pub async fn delete_highlight(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM highlights WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::users::tests::new_user;
    use crate::models::Role;

    #[tokio::test]
    async fn test_highlight_cover_swap() {
        let db = Database::new_in_memory().await.unwrap();
        let owner = db.insert_user(new_user("star", Role::Contestant)).await.unwrap();
        let cover = MediaAsset {
            url: "https://media.test/one.jpg".to_string(),
            public_id: "one".to_string(),
            resource_type: "image".to_string(),
        };
        let created = db.insert_highlight(owner.id, "Tour", &cover, None).await.unwrap();

        let renamed = db.update_highlight(created.id, "World tour", None).await.unwrap();
        assert_eq!(renamed.title, "World tour");
        assert_eq!(renamed.cover_public_id, "one");

        let next = MediaAsset {
            public_id: "two".to_string(),
            ..cover
        };
        let swapped = db.update_highlight(created.id, "World tour", Some(&next)).await.unwrap();
        assert_eq!(swapped.cover(), next);

        assert_eq!(db.list_highlights_for_owner(owner.id).await.unwrap().len(), 1);
        db.delete_highlight(created.id).await.unwrap();
        assert!(db.find_highlight(created.id).await.unwrap().is_none());
    }
}
