use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::Database;
use crate::error::{AppError, AppResult};
use crate::models::{current_time_millis, MediaAsset, Page, PageRequest, Role, UserRecord, UserStatus, UserView};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub nationality: Option<String>,
    pub country: String,
    pub state: String,
    pub city: String,
    pub role: Role,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: String,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub instagram_link: Option<String>,
    pub facebook_link: Option<String>,
    pub tiktok_link: Option<String>,
    pub youtube_link: Option<String>,
    pub spotify_link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestantSort {
    #[default]
    NewContestants,
    OldContestants,
    TopVoted,
}

#[derive(Debug, Clone, Default)]
pub struct ContestantFilters {
    pub query: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
    pub sort: ContestantSort,
    /// Admin listings include suspended contestants.
    pub include_suspended: bool,
}

#[derive(Debug, FromRow)]
struct ContestantRow {
    #[sqlx(flatten)]
    user: UserRecord,
    votes_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestantSummary {
    #[serde(flatten)]
    pub user: UserView,
    pub votes_count: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub countries: Vec<String>,
    pub states: Vec<String>,
    pub cities: Vec<String>,
    pub eye_colors: Vec<String>,
    pub hair_colors: Vec<String>,
}

/// `%term%` with LIKE wildcards escaped (use with `ESCAPE '\'`).
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_contestant_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &ContestantFilters) {
    qb.push(" WHERE u.role = 'contestant'");
    if !filters.include_suspended {
        qb.push(" AND u.status = 'active'");
    }
    if let Some(query) = filters.query.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = like_pattern(query);
        qb.push(" AND (u.username LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR u.display_name LIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\')");
    }
    let exact = [
        ("u.country", &filters.country),
        ("u.state", &filters.state),
        ("u.city", &filters.city),
        ("u.eye_color", &filters.eye_color),
        ("u.hair_color", &filters.hair_color),
    ];
    for (column, value) in exact {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            qb.push(format!(" AND {} = ", column));
            qb.push_bind(value.trim().to_string());
            qb.push(" COLLATE NOCASE");
        }
    }
}

impl Database {
    pub async fn insert_user(&self, new_user: NewUser) -> AppResult<UserRecord> {
        let id = self.next_id();
        let now = current_time_millis();
        let display_name = format!("{} {}", new_user.first_name, new_user.last_name)
            .trim()
            .to_string();

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, password_hash, first_name, last_name, phone,
                date_of_birth, nationality, country, state, city, role,
                height, weight, eye_color, hair_color, display_name, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.phone)
        .bind(new_user.date_of_birth)
        .bind(&new_user.nationality)
        .bind(&new_user.country)
        .bind(&new_user.state)
        .bind(&new_user.city)
        .bind(new_user.role)
        .bind(new_user.height)
        .bind(new_user.weight)
        .bind(&new_user.eye_color)
        .bind(&new_user.hair_color)
        .bind(display_name)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("User with this email or username already exists!".to_string())
            }
            _ => AppError::DatabaseError(format!("Failed to create user: {}", e)),
        })?;

        self.get_user(id).await
    }

    pub async fn find_user(&self, id: i64) -> AppResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> AppResult<UserRecord> {
        self.find_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub async fn find_user_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT * FROM users WHERE username = ? OR email = ? COLLATE NOCASE LIMIT 1",
        )
        .bind(username.map(|u| u.trim().to_lowercase()))
        .bind(email.map(|e| e.trim().to_string()))
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    pub async fn find_active_user_by_username(&self, username: &str) -> AppResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT * FROM users WHERE username = ? AND status = 'active'",
        )
        .bind(username.trim().to_lowercase())
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    pub async fn username_or_email_taken(&self, username: &str, email: &str) -> AppResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM users WHERE username = ? OR email = ? COLLATE NOCASE LIMIT 1",
        )
        .bind(username)
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.is_some())
    }

    pub async fn set_user_refresh_token(&self, id: i64, token: Option<&str>) -> AppResult<()> {
        sqlx::query("UPDATE users SET refresh_token = ?, updated_at = ? WHERE id = ?")
            .bind(token)
            .bind(current_time_millis())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn update_user_password(&self, id: i64, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(current_time_millis())
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    pub async fn mark_phone_verified(&self, id: i64, phone: &str) -> AppResult<UserRecord> {
        sqlx::query("UPDATE users SET phone = ?, phone_verified = 1, updated_at = ? WHERE id = ?")
            .bind(phone)
            .bind(current_time_millis())
            .bind(id)
            .execute(self.pool())
            .await?;
        self.get_user(id).await
    }

    pub async fn update_user_profile(&self, id: i64, update: &ProfileUpdate) -> AppResult<UserRecord> {
        let result = sqlx::query(
            r#"
            UPDATE users SET display_name = ?, bio = ?, website = ?, instagram_link = ?,
                facebook_link = ?, tiktok_link = ?, youtube_link = ?, spotify_link = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.display_name.trim())
        .bind(&update.bio)
        .bind(&update.website)
        .bind(&update.instagram_link)
        .bind(&update.facebook_link)
        .bind(&update.tiktok_link)
        .bind(&update.youtube_link)
        .bind(&update.spotify_link)
        .bind(current_time_millis())
        .bind(id)
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        self.get_user(id).await
    }

    pub async fn update_user_photo(&self, id: i64, photo: &MediaAsset) -> AppResult<UserRecord> {
        sqlx::query("UPDATE users SET photo_url = ?, photo_public_id = ?, updated_at = ? WHERE id = ?")
            .bind(&photo.url)
            .bind(&photo.public_id)
            .bind(current_time_millis())
            .bind(id)
            .execute(self.pool())
            .await?;
        self.get_user(id).await
    }

    pub async fn upgrade_user_to_contestant(
        &self,
        id: i64,
        height: f64,
        weight: f64,
        eye_color: &str,
        hair_color: &str,
    ) -> AppResult<UserRecord> {
        sqlx::query(
            r#"
            UPDATE users SET role = 'contestant', height = ?, weight = ?, eye_color = ?,
                hair_color = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(height)
        .bind(weight)
        .bind(eye_color)
        .bind(hair_color)
        .bind(current_time_millis())
        .bind(id)
        .execute(self.pool())
        .await?;
        self.get_user(id).await
    }

    pub async fn set_user_status(&self, id: i64, status: UserStatus) -> AppResult<()> {
        sqlx::query("UPDATE users SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(current_time_millis())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn list_contestants(
        &self,
        filters: &ContestantFilters,
        page: PageRequest,
    ) -> AppResult<Page<ContestantSummary>> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users u");
        push_contestant_filters(&mut count_qb, filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(self.pool()).await?;

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT u.*, (SELECT COUNT(*) FROM votes v WHERE v.contestant_id = u.id) AS votes_count FROM users u",
        );
        push_contestant_filters(&mut qb, filters);
        qb.push(match filters.sort {
            ContestantSort::NewContestants => " ORDER BY u.created_at DESC, u.id DESC",
            ContestantSort::OldContestants => " ORDER BY u.created_at ASC, u.id ASC",
            ContestantSort::TopVoted => " ORDER BY votes_count DESC, u.created_at DESC, u.id DESC",
        });
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows: Vec<ContestantRow> = qb.build_query_as().fetch_all(self.pool()).await?;
        let docs = rows
            .into_iter()
            .map(|row| ContestantSummary {
                user: UserView::from(&row.user),
                votes_count: row.votes_count,
            })
            .collect();
        Ok(Page::new(docs, total, page))
    }

    pub async fn contestant_filter_options(&self) -> AppResult<FilterOptions> {
        async fn distinct(db: &Database, column: &str) -> AppResult<Vec<String>> {
            let sql = format!(
                "SELECT DISTINCT {col} FROM users WHERE role = 'contestant' AND status = 'active' \
                 AND {col} IS NOT NULL AND {col} != '' ORDER BY {col} COLLATE NOCASE",
                col = column
            );
            let values: Vec<String> = sqlx::query_scalar(&sql).fetch_all(db.pool()).await?;
            Ok(values)
        }

        Ok(FilterOptions {
            countries: distinct(self, "country").await?,
            states: distinct(self, "state").await?,
            cities: distinct(self, "city").await?,
            eye_colors: distinct(self, "eye_color").await?,
            hair_colors: distinct(self, "hair_color").await?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn new_user(username: &str, role: Role) -> NewUser {
        let contestant = role == Role::Contestant;
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "hash".to_string(),
            first_name: username.to_string(),
            last_name: "Tester".to_string(),
            phone: "+15550000000".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            nationality: None,
            country: "Canada".to_string(),
            state: "Ontario".to_string(),
            city: "Toronto".to_string(),
            role,
            height: contestant.then_some(170.0),
            weight: contestant.then_some(55.0),
            eye_color: contestant.then(|| "brown".to_string()),
            hair_color: contestant.then(|| "black".to_string()),
        }
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" ann "), "%ann%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let db = Database::new_in_memory().await.unwrap();
        db.insert_user(new_user("amy", Role::Voter)).await.unwrap();
        let err = db.insert_user(new_user("amy", Role::Voter)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(db.username_or_email_taken("amy", "other@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_contestant_listing_sorts_by_votes() {
        let db = Database::new_in_memory().await.unwrap();
        let a = db.insert_user(new_user("alpha", Role::Contestant)).await.unwrap();
        let b = db.insert_user(new_user("beta", Role::Contestant)).await.unwrap();
        let voter = db.insert_user(new_user("vera", Role::Voter)).await.unwrap();
        db.toggle_edge(crate::models::EdgeKind::Vote, voter.id, b.id).await.unwrap();

        let filters = ContestantFilters {
            sort: ContestantSort::TopVoted,
            ..Default::default()
        };
        let page = db.list_contestants(&filters, PageRequest::default()).await.unwrap();
        assert_eq!(page.total_docs, 2);
        assert_eq!(page.docs[0].user.id, b.id);
        assert_eq!(page.docs[0].votes_count, 1);
        assert_eq!(page.docs[1].user.id, a.id);

        let filters = ContestantFilters {
            query: Some("alp".to_string()),
            ..Default::default()
        };
        let page = db.list_contestants(&filters, PageRequest::default()).await.unwrap();
        assert_eq!(page.total_docs, 1);
        assert_eq!(page.docs[0].user.username, "alpha");
    }

    #[tokio::test]
    async fn test_suspended_contestants_hidden_from_public_listing() {
        let db = Database::new_in_memory().await.unwrap();
        let a = db.insert_user(new_user("alpha", Role::Contestant)).await.unwrap();
        db.set_user_status(a.id, UserStatus::Suspended).await.unwrap();

        let public = db
            .list_contestants(&ContestantFilters::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(public.total_docs, 0);

        let admin = ContestantFilters {
            include_suspended: true,
            ..Default::default()
        };
        let all = db.list_contestants(&admin, PageRequest::default()).await.unwrap();
        assert_eq!(all.total_docs, 1);

        let options = db.contestant_filter_options().await.unwrap();
        assert!(options.countries.is_empty());
    }
}
