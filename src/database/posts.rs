use sqlx::types::Json;
use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::Database;
use crate::error::{AppError, AppResult};
use crate::models::{current_time_millis, MediaAsset, Page, PageRequest, PostRecord, PostStatus, ProfileSummary};

/// Which posts a listing covers. Every scope except `Status` hides rejected
/// posts and posts of suspended owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    /// Guest feed: every visible post.
    Visible,
    /// Posts owned by accounts the user follows.
    FollowedBy(i64),
    /// Posts of a single owner.
    Owner(i64),
    /// Posts the user liked, newest like first.
    LikedBy(i64),
    /// Posts the user saved, newest save first.
    SavedBy(i64),
    /// Moderation queue, regardless of owner state.
    Status(PostStatus),
}

#[derive(Debug, FromRow)]
struct PostRow {
    #[sqlx(flatten)]
    post: PostRecord,
    owner_username: String,
    owner_fullname: String,
    owner_display_name: String,
    owner_photo: Option<String>,
}

impl PostRow {
    fn split(self) -> (PostRecord, ProfileSummary) {
        let owner = ProfileSummary {
            id: self.post.owner_id,
            username: self.owner_username,
            fullname: self.owner_fullname,
            display_name: self.owner_display_name,
            profile_photo: self.owner_photo,
        };
        (self.post, owner)
    }
}

const POST_WITH_OWNER_COLUMNS: &str = "p.*, u.username AS owner_username, \
     TRIM(u.first_name || ' ' || u.last_name) AS owner_fullname, \
     u.display_name AS owner_display_name, u.photo_url AS owner_photo";

fn push_scope(qb: &mut QueryBuilder<'_, Sqlite>, scope: PostScope) {
    qb.push(" FROM posts p JOIN users u ON u.id = p.owner_id");
    match scope {
        PostScope::LikedBy(user_id) => {
            qb.push(" JOIN likes e ON e.post_id = p.id AND e.liked_by = ");
            qb.push_bind(user_id);
        }
        PostScope::SavedBy(user_id) => {
            qb.push(" JOIN saved e ON e.post_id = p.id AND e.user_id = ");
            qb.push_bind(user_id);
        }
        _ => {}
    }

    match scope {
        PostScope::Status(status) => {
            qb.push(" WHERE p.status = ");
            qb.push_bind(status);
        }
        _ => {
            qb.push(" WHERE p.status != 'rejected' AND u.status = 'active'");
        }
    }

    match scope {
        PostScope::FollowedBy(user_id) => {
            qb.push(" AND p.owner_id IN (SELECT profile_id FROM follows WHERE follower_id = ");
            qb.push_bind(user_id);
            qb.push(")");
        }
        PostScope::Owner(owner_id) => {
            qb.push(" AND p.owner_id = ");
            qb.push_bind(owner_id);
        }
        _ => {}
    }
}

fn order_clause(scope: PostScope) -> &'static str {
    match scope {
        PostScope::LikedBy(_) | PostScope::SavedBy(_) => " ORDER BY e.created_at DESC, p.id DESC",
        _ => " ORDER BY p.created_at DESC, p.id DESC",
    }
}

impl Database {
    pub async fn insert_post(
        &self,
        owner_id: i64,
        caption: Option<&str>,
        location: Option<&str>,
        media: &[MediaAsset],
    ) -> AppResult<PostRecord> {
        let id = self.next_id();
        let now = current_time_millis();
        let media_type = media.first().map(|m| m.resource_type.clone());

        sqlx::query(
            r#"
            INSERT INTO posts (id, owner_id, caption, location, media, media_type, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(caption)
        .bind(location)
        .bind(Json(media))
        .bind(media_type)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_post(id).await
    }

    pub async fn find_post(&self, id: i64) -> AppResult<Option<PostRecord>> {
        let post = sqlx::query_as::<_, PostRecord>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(post)
    }

    pub async fn get_post(&self, id: i64) -> AppResult<PostRecord> {
        self.find_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    /// Post and owner projection, only when visible to the public.
    pub async fn find_visible_post_with_owner(&self, id: i64) -> AppResult<Option<(PostRecord, ProfileSummary)>> {
        let sql = format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.owner_id \
             WHERE p.id = ? AND p.status != 'rejected' AND u.status = 'active'",
            POST_WITH_OWNER_COLUMNS
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(PostRow::split))
    }

    pub async fn update_post_details(
        &self,
        id: i64,
        caption: Option<&str>,
        location: Option<&str>,
    ) -> AppResult<PostRecord> {
        sqlx::query("UPDATE posts SET caption = ?, location = ?, updated_at = ? WHERE id = ?")
            .bind(caption)
            .bind(location)
            .bind(current_time_millis())
            .bind(id)
            .execute(self.pool())
            .await?;
        self.get_post(id).await
    }

    pub async fn set_post_status(&self, id: i64, status: PostStatus) -> AppResult<PostRecord> {
        let result = sqlx::query("UPDATE posts SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(current_time_millis())
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        self.get_post(id).await
    }

    /// Remove a post with its likes, saves and notifications; highlights
    /// pointing at it are detached. Returns the deleted row for media cleanup.
    pub async fn delete_post(&self, id: i64) -> AppResult<PostRecord> {
        let post = self.get_post(id).await?;
        let mut tx = self.begin().await?;

        for sql in [
            "DELETE FROM likes WHERE post_id = ?",
            "DELETE FROM saved WHERE post_id = ?",
            "DELETE FROM notifications WHERE post_id = ?",
            "UPDATE highlights SET post_id = NULL WHERE post_id = ?",
            "DELETE FROM posts WHERE id = ?",
        ] {
            sqlx::query(sql).bind(id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(post)
    }

    pub async fn list_posts(
        &self,
        scope: PostScope,
        page: PageRequest,
    ) -> AppResult<Page<(PostRecord, ProfileSummary)>> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*)");
        push_scope(&mut count_qb, scope);
        let total: i64 = count_qb.build_query_scalar().fetch_one(self.pool()).await?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {}", POST_WITH_OWNER_COLUMNS));
        push_scope(&mut qb, scope);
        qb.push(order_clause(scope));
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows: Vec<PostRow> = qb.build_query_as().fetch_all(self.pool()).await?;
        let docs = rows.into_iter().map(PostRow::split).collect();
        Ok(Page::new(docs, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::users::tests::new_user;
    use crate::models::{EdgeKind, Role, UserStatus};

    fn media(id: &str) -> MediaAsset {
        MediaAsset {
            url: format!("https://media.test/{}.jpg", id),
            public_id: id.to_string(),
            resource_type: "image".to_string(),
        }
    }

    #[tokio::test]
    async fn test_followed_scope_only_contains_followed_owners() {
        let db = Database::new_in_memory().await.unwrap();
        let viewer = db.insert_user(new_user("viewer", Role::Voter)).await.unwrap();
        let followed = db.insert_user(new_user("followed", Role::Contestant)).await.unwrap();
        let stranger = db.insert_user(new_user("stranger", Role::Contestant)).await.unwrap();
        db.toggle_edge(EdgeKind::Follow, viewer.id, followed.id).await.unwrap();

        let mine = db.insert_post(followed.id, Some("hi"), None, &[media("a")]).await.unwrap();
        db.insert_post(stranger.id, Some("nope"), None, &[media("b")]).await.unwrap();

        let feed = db
            .list_posts(PostScope::FollowedBy(viewer.id), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(feed.total_docs, 1);
        let (post, owner) = &feed.docs[0];
        assert_eq!(post.id, mine.id);
        assert_eq!(owner.username, "followed");
        assert_eq!(post.media.0, vec![media("a")]);
        assert_eq!(post.media_type.as_deref(), Some("image"));

        let all = db.list_posts(PostScope::Visible, PageRequest::default()).await.unwrap();
        assert_eq!(all.total_docs, 2);
    }

    #[tokio::test]
    async fn test_rejected_and_suspended_posts_are_hidden() {
        let db = Database::new_in_memory().await.unwrap();
        let a = db.insert_user(new_user("alpha", Role::Contestant)).await.unwrap();
        let b = db.insert_user(new_user("beta", Role::Contestant)).await.unwrap();
        let rejected = db.insert_post(a.id, None, None, &[media("a")]).await.unwrap();
        db.set_post_status(rejected.id, PostStatus::Rejected).await.unwrap();
        db.insert_post(b.id, None, None, &[media("b")]).await.unwrap();
        db.set_user_status(b.id, UserStatus::Suspended).await.unwrap();

        let visible = db.list_posts(PostScope::Visible, PageRequest::default()).await.unwrap();
        assert_eq!(visible.total_docs, 0);
        assert!(db.find_visible_post_with_owner(rejected.id).await.unwrap().is_none());

        let queue = db
            .list_posts(PostScope::Status(PostStatus::Rejected), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(queue.total_docs, 1);
    }

    #[tokio::test]
    async fn test_delete_post_removes_edges() {
        let db = Database::new_in_memory().await.unwrap();
        let owner = db.insert_user(new_user("owner", Role::Contestant)).await.unwrap();
        let fan = db.insert_user(new_user("fan", Role::Voter)).await.unwrap();
        let post = db.insert_post(owner.id, None, None, &[media("a")]).await.unwrap();
        db.toggle_edge(EdgeKind::Like, fan.id, post.id).await.unwrap();
        db.toggle_edge(EdgeKind::Save, fan.id, post.id).await.unwrap();

        let liked = db.list_posts(PostScope::LikedBy(fan.id), PageRequest::default()).await.unwrap();
        assert_eq!(liked.total_docs, 1);

        let deleted = db.delete_post(post.id).await.unwrap();
        assert_eq!(deleted.media.0.len(), 1);
        assert!(db.find_post(post.id).await.unwrap().is_none());
        assert!(!db.edge_exists(EdgeKind::Like, fan.id, post.id).await.unwrap());
        assert!(!db.edge_exists(EdgeKind::Save, fan.id, post.id).await.unwrap());
    }
}
