use sqlx::FromRow;

use super::{Database, PROFILE_SUMMARY_COLUMNS};
use crate::error::AppResult;
use crate::models::{
    current_time_millis, NotificationKind, NotificationRecord, NotificationView, Page, PageRequest, ProfileSummary,
};

#[derive(Debug, FromRow)]
struct NotificationRow {
    #[sqlx(flatten)]
    record: NotificationRecord,
    #[sqlx(flatten)]
    sender: SenderColumns,
}

/// Sender projection under `sender_*` aliases so it can sit beside the
/// notification's own `id`.
#[derive(Debug, FromRow)]
struct SenderColumns {
    sender_username: String,
    sender_fullname: String,
    sender_display_name: String,
    sender_photo: Option<String>,
}

impl Database {
    pub async fn insert_notification(
        &self,
        recipient_id: i64,
        sender_id: i64,
        kind: NotificationKind,
        post_id: Option<i64>,
        link: &str,
    ) -> AppResult<NotificationRecord> {
        let id = self.next_id();
        let now = current_time_millis();
        sqlx::query(
            "INSERT INTO notifications (id, recipient_id, sender_id, kind, post_id, link, read, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(id)
        .bind(recipient_id)
        .bind(sender_id)
        .bind(kind)
        .bind(post_id)
        .bind(link)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(NotificationRecord {
            id,
            recipient_id,
            sender_id,
            kind,
            post_id,
            link: link.to_string(),
            read: false,
            created_at: now,
        })
    }

    /// Unread first, then newest.
    pub async fn list_notifications(
        &self,
        recipient_id: i64,
        page: PageRequest,
    ) -> AppResult<Page<NotificationView>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient_id = ?")
            .bind(recipient_id)
            .fetch_one(self.pool())
            .await?;

        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT n.*, u.username AS sender_username,
                TRIM(u.first_name || ' ' || u.last_name) AS sender_fullname,
                u.display_name AS sender_display_name, u.photo_url AS sender_photo
            FROM notifications n JOIN users u ON u.id = n.sender_id
            WHERE n.recipient_id = ?
            ORDER BY n.read ASC, n.created_at DESC, n.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(recipient_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        let docs = rows
            .into_iter()
            .map(|row| {
                let sender = ProfileSummary {
                    id: row.record.sender_id,
                    username: row.sender.sender_username,
                    fullname: row.sender.sender_fullname,
                    display_name: row.sender.sender_display_name,
                    profile_photo: row.sender.sender_photo,
                };
                NotificationView::new(row.record, sender)
            })
            .collect();
        Ok(Page::new(docs, total, page))
    }

    pub async fn unread_notification_count(&self, recipient_id: i64) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND read = 0")
                .bind(recipient_id)
                .fetch_one(self.pool())
                .await?;
        Ok(count)
    }

    /// Returns how many notifications flipped to read.
    pub async fn mark_notifications_read(&self, recipient_id: i64) -> AppResult<u64> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE recipient_id = ? AND read = 0")
            .bind(recipient_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    /// Sender projection for a single id, used when echoing a fresh notification.
    pub async fn find_profile_summary(&self, user_id: i64) -> AppResult<Option<ProfileSummary>> {
        let sql = format!("SELECT {} FROM users u WHERE u.id = ?", PROFILE_SUMMARY_COLUMNS);
        let summary = sqlx::query_as::<_, ProfileSummary>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::users::tests::new_user;
    use crate::models::Role;

    #[tokio::test]
    async fn test_unread_first_and_mark_read() {
        let db = Database::new_in_memory().await.unwrap();
        let star = db.insert_user(new_user("star", Role::Contestant)).await.unwrap();
        let fan = db.insert_user(new_user("fan", Role::Voter)).await.unwrap();

        db.insert_notification(star.id, fan.id, NotificationKind::Follow, None, "https://app.test/fan")
            .await
            .unwrap();
        assert_eq!(db.unread_notification_count(star.id).await.unwrap(), 1);
        assert_eq!(db.mark_notifications_read(star.id).await.unwrap(), 1);
        db.insert_notification(star.id, fan.id, NotificationKind::Vote, None, "https://app.test/fan")
            .await
            .unwrap();

        let page = db.list_notifications(star.id, PageRequest::default()).await.unwrap();
        assert_eq!(page.total_docs, 2);
        assert_eq!(page.docs[0].kind, NotificationKind::Vote);
        assert!(!page.docs[0].read);
        assert!(page.docs[1].read);
        assert_eq!(page.docs[0].sender.username, "fan");

        let summary = db.find_profile_summary(fan.id).await.unwrap().unwrap();
        assert_eq!(summary.fullname, "fan Tester");
    }
}
