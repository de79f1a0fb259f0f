use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::millis_to_datetime;

#[derive(Debug, Clone, FromRow)]
pub struct AdminRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<&AdminRecord> for AdminView {
    fn from(admin: &AdminRecord) -> Self {
        Self {
            id: admin.id,
            username: admin.username.clone(),
            created_at: millis_to_datetime(admin.created_at),
        }
    }
}
