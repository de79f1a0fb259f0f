use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::millis_to_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Voter,
    Contestant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Voter => "voter",
            Role::Contestant => "contestant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Suspended,
}

/// Full `users` row, secrets included. Never serialized directly.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub phone_verified: bool,
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
    pub status: UserStatus,
    pub refresh_token: Option<String>,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub photo_public_id: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub instagram_link: Option<String>,
    pub facebook_link: Option<String>,
    pub tiktok_link: Option<String>,
    pub youtube_link: Option<String>,
    pub spotify_link: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl UserRecord {
    pub fn fullname(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn is_contestant(&self) -> bool {
        self.role == Role::Contestant
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Public projection of a user with profile details.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub fullname: String,
    pub phone: String,
    pub phone_verified: bool,
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
    pub status: UserStatus,
    pub display_name: String,
    pub profile_photo: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub instagram_link: Option<String>,
    pub facebook_link: Option<String>,
    pub tiktok_link: Option<String>,
    pub youtube_link: Option<String>,
    pub spotify_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserView {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            fullname: user.fullname(),
            phone: user.phone.clone(),
            phone_verified: user.phone_verified,
            date_of_birth: user.date_of_birth,
            nationality: user.nationality.clone(),
            country: user.country.clone(),
            state: user.state.clone(),
            city: user.city.clone(),
            role: user.role,
            height: user.height,
            weight: user.weight,
            eye_color: user.eye_color.clone(),
            hair_color: user.hair_color.clone(),
            status: user.status,
            display_name: user.display_name.clone(),
            profile_photo: user.photo_url.clone(),
            bio: user.bio.clone(),
            website: user.website.clone(),
            instagram_link: user.instagram_link.clone(),
            facebook_link: user.facebook_link.clone(),
            tiktok_link: user.tiktok_link.clone(),
            youtube_link: user.youtube_link.clone(),
            spotify_link: user.spotify_link.clone(),
            created_at: millis_to_datetime(user.created_at),
            updated_at: millis_to_datetime(user.updated_at),
        }
    }
}

impl From<UserRecord> for UserView {
    fn from(user: UserRecord) -> Self {
        UserView::from(&user)
    }
}

/// Owner/follower/voter projection used inside list views.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: i64,
    pub username: String,
    pub fullname: String,
    pub display_name: String,
    pub profile_photo: Option<String>,
}

impl From<&UserRecord> for ProfileSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            fullname: user.fullname(),
            display_name: user.display_name.clone(),
            profile_photo: user.photo_url.clone(),
        }
    }
}
