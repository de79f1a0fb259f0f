use super::Database;
use crate::error::{AppError, AppResult};
use crate::models::{current_time_millis, AdminRecord};

impl Database {
    pub async fn count_admins(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    /// Insert all admins in one transaction.
    pub async fn insert_admins(&self, accounts: &[(String, String)]) -> AppResult<Vec<AdminRecord>> {
        let now = current_time_millis();
        let mut tx = self.begin().await?;
        let mut created = Vec::with_capacity(accounts.len());

        for (username, password_hash) in accounts {
            let record = AdminRecord {
                id: self.next_id(),
                username: username.clone(),
                password_hash: password_hash.clone(),
                refresh_token: None,
                created_at: now,
                updated_at: now,
            };
            sqlx::query(
                "INSERT INTO admins (id, username, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(record.id)
            .bind(&record.username)
            .bind(&record.password_hash)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict(format!("Admin {} already exists", username))
                }
                _ => AppError::from(e),
            })?;
            created.push(record);
        }

        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_admin(&self, id: i64) -> AppResult<Option<AdminRecord>> {
        let admin = sqlx::query_as::<_, AdminRecord>("SELECT * FROM admins WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(admin)
    }

    pub async fn find_admin_by_username(&self, username: &str) -> AppResult<Option<AdminRecord>> {
        let admin = sqlx::query_as::<_, AdminRecord>("SELECT * FROM admins WHERE username = ?")
            .bind(username.trim().to_lowercase())
            .fetch_optional(self.pool())
            .await?;
        Ok(admin)
    }

    pub async fn set_admin_refresh_token(&self, id: i64, token: Option<&str>) -> AppResult<()> {
        sqlx::query("UPDATE admins SET refresh_token = ?, updated_at = ? WHERE id = ?")
            .bind(token)
            .bind(current_time_millis())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_admin_insert_and_lookup() {
        let db = Database::new_in_memory().await.unwrap();
        assert_eq!(db.count_admins().await.unwrap(), 0);

        let created = db
            .insert_admins(&[("root".to_string(), "hash".to_string())])
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(db.count_admins().await.unwrap(), 1);

        let found = db.find_admin_by_username(" ROOT ").await.unwrap().unwrap();
        assert_eq!(found.id, created[0].id);

        db.set_admin_refresh_token(found.id, Some("token")).await.unwrap();
        let reloaded = db.find_admin(found.id).await.unwrap().unwrap();
        assert_eq!(reloaded.refresh_token.as_deref(), Some("token"));

        let err = db
            .insert_admins(&[("root".to_string(), "hash".to_string())])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
