use serde::Serialize;
use sqlx::types::Json;

use super::Database;
use crate::error::{AppError, AppResult};
use crate::models::{MediaAsset, UserRecord};

/// What a contestant removal deleted, plus the remote media left to clean up.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub user_id: i64,
    pub posts: u64,
    pub follows: u64,
    pub likes: u64,
    pub saved: u64,
    pub votes: u64,
    pub highlights: u64,
    pub advertisements: u64,
    pub notifications: u64,
    #[serde(skip)]
    pub media: Vec<MediaAsset>,
}

impl Database {
    /// Delete a user and everything that references them in one transaction.
    /// Remote media is only collected here; the caller deletes it after commit.
    pub async fn delete_user_cascade(&self, user_id: i64) -> AppResult<CascadeReport> {
        let mut tx = self.begin().await?;

        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Contestant not found".to_string()))?;

        let mut report = CascadeReport {
            user_id,
            ..Default::default()
        };

        let post_media: Vec<Json<Vec<MediaAsset>>> = sqlx::query_scalar("SELECT media FROM posts WHERE owner_id = ?")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;
        report.media.extend(post_media.into_iter().flat_map(|m| m.0));

        let covers: Vec<(String, String)> =
            sqlx::query_as("SELECT cover_url, cover_public_id FROM highlights WHERE owner_id = ?")
                .bind(user_id)
                .fetch_all(&mut *tx)
                .await?;
        report.media.extend(covers.into_iter().map(|(url, public_id)| MediaAsset {
            url,
            public_id,
            resource_type: "image".to_string(),
        }));

        let ad_images: Vec<Json<Vec<MediaAsset>>> =
            sqlx::query_scalar("SELECT images FROM advertisements WHERE contestant_id = ?")
                .bind(user_id)
                .fetch_all(&mut *tx)
                .await?;
        report.media.extend(ad_images.into_iter().flat_map(|m| m.0));

        if let (Some(url), Some(public_id)) = (user.photo_url.clone(), user.photo_public_id.clone()) {
            report.media.push(MediaAsset {
                url,
                public_id,
                resource_type: "image".to_string(),
            });
        }

        const OWNED_POSTS: &str = "(SELECT id FROM posts WHERE owner_id = ?1)";

        report.likes = sqlx::query(&format!(
            "DELETE FROM likes WHERE liked_by = ?1 OR post_id IN {}",
            OWNED_POSTS
        ))
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        report.saved = sqlx::query(&format!(
            "DELETE FROM saved WHERE user_id = ?1 OR post_id IN {}",
            OWNED_POSTS
        ))
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        report.notifications = sqlx::query(&format!(
            "DELETE FROM notifications WHERE recipient_id = ?1 OR sender_id = ?1 OR post_id IN {}",
            OWNED_POSTS
        ))
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(&format!(
            "UPDATE highlights SET post_id = NULL WHERE post_id IN {}",
            OWNED_POSTS
        ))
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        report.follows = sqlx::query("DELETE FROM follows WHERE follower_id = ?1 OR profile_id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        report.votes = sqlx::query("DELETE FROM votes WHERE voter_id = ?1 OR contestant_id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        report.highlights = sqlx::query("DELETE FROM highlights WHERE owner_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        report.advertisements = sqlx::query("DELETE FROM advertisements WHERE contestant_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM subscriptions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        report.posts = sqlx::query("DELETE FROM posts WHERE owner_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(report)
    }
}
