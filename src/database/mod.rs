// SQLite persistence. One `Database` handle owns the pool and the id generator;
// table-specific queries live in the submodules as additional `impl` blocks.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};
use crate::infrastructure::id_generator::IdGenerator;

pub mod admins;
pub mod advertisements;
pub mod cascade;
pub mod edges;
pub mod highlights;
pub mod notifications;
pub mod posts;
pub mod subscriptions;
pub mod users;

pub use advertisements::NewAdvertisement;
pub use cascade::CascadeReport;
pub use edges::EdgeEnd;
pub use posts::PostScope;
pub use users::{ContestantFilters, ContestantSort, ContestantSummary, FilterOptions, NewUser, ProfileUpdate};

/// Columns projecting a `users` row (aliased `u`) into a `ProfileSummary`.
pub(crate) const PROFILE_SUMMARY_COLUMNS: &str = "u.id AS id, u.username AS username, \
     TRIM(u.first_name || ' ' || u.last_name) AS fullname, \
     u.display_name AS display_name, u.photo_url AS profile_photo";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        phone TEXT NOT NULL,
        phone_verified INTEGER NOT NULL DEFAULT 0,
        date_of_birth TEXT NOT NULL,
        nationality TEXT,
        country TEXT NOT NULL,
        state TEXT NOT NULL,
        city TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('voter', 'contestant')),
        height REAL,
        weight REAL,
        eye_color TEXT,
        hair_color TEXT,
        status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'suspended')),
        refresh_token TEXT,
        display_name TEXT NOT NULL,
        photo_url TEXT,
        photo_public_id TEXT,
        bio TEXT,
        website TEXT,
        instagram_link TEXT,
        facebook_link TEXT,
        tiktok_link TEXT,
        youtube_link TEXT,
        spotify_link TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        CHECK (role = 'voter' OR (height IS NOT NULL AND weight IS NOT NULL
            AND eye_color IS NOT NULL AND hair_color IS NOT NULL))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_users_location ON users(country, state, city)",
    r#"
    CREATE TABLE IF NOT EXISTS admins (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        refresh_token TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY,
        owner_id INTEGER NOT NULL REFERENCES users(id),
        caption TEXT,
        location TEXT,
        media TEXT NOT NULL DEFAULT '[]',
        media_type TEXT,
        status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'approved', 'rejected')),
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_posts_owner ON posts(owner_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status, created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS follows (
        follower_id INTEGER NOT NULL REFERENCES users(id),
        profile_id INTEGER NOT NULL REFERENCES users(id),
        created_at INTEGER NOT NULL,
        PRIMARY KEY (follower_id, profile_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_follows_profile ON follows(profile_id, created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS likes (
        liked_by INTEGER NOT NULL REFERENCES users(id),
        post_id INTEGER NOT NULL REFERENCES posts(id),
        created_at INTEGER NOT NULL,
        PRIMARY KEY (liked_by, post_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_likes_post ON likes(post_id)",
    r#"
    CREATE TABLE IF NOT EXISTS saved (
        user_id INTEGER NOT NULL REFERENCES users(id),
        post_id INTEGER NOT NULL REFERENCES posts(id),
        created_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, post_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_saved_post ON saved(post_id)",
    r#"
    CREATE TABLE IF NOT EXISTS votes (
        voter_id INTEGER NOT NULL REFERENCES users(id),
        contestant_id INTEGER NOT NULL REFERENCES users(id),
        created_at INTEGER NOT NULL,
        PRIMARY KEY (voter_id, contestant_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_votes_contestant ON votes(contestant_id)",
    r#"
    CREATE TABLE IF NOT EXISTS highlights (
        id INTEGER PRIMARY KEY,
        owner_id INTEGER NOT NULL REFERENCES users(id),
        title TEXT NOT NULL,
        cover_url TEXT NOT NULL,
        cover_public_id TEXT NOT NULL,
        post_id INTEGER REFERENCES posts(id),
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_highlights_owner ON highlights(owner_id)",
    r#"
    CREATE TABLE IF NOT EXISTS advertisements (
        id INTEGER PRIMARY KEY,
        kind TEXT NOT NULL CHECK (kind IN ('global', 'individual')),
        contestant_id INTEGER REFERENCES users(id),
        placement TEXT CHECK (placement IN ('primary', 'secondary')),
        images TEXT NOT NULL DEFAULT '[]',
        start_at INTEGER NOT NULL,
        end_at INTEGER NOT NULL,
        duration_seconds INTEGER NOT NULL,
        hyperlink TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_ads_contestant ON advertisements(contestant_id)",
    r#"
    CREATE TABLE IF NOT EXISTS subscriptions (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
        customer_id TEXT NOT NULL,
        subscription_id TEXT NOT NULL UNIQUE,
        price_id TEXT NOT NULL,
        current_period_end INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY,
        recipient_id INTEGER NOT NULL REFERENCES users(id),
        sender_id INTEGER NOT NULL REFERENCES users(id),
        kind TEXT NOT NULL CHECK (kind IN ('follow', 'like', 'vote')),
        post_id INTEGER REFERENCES posts(id),
        link TEXT NOT NULL,
        read INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id, read, created_at DESC)",
];

pub struct Database {
    pool: SqlitePool,
    ids: Arc<IdGenerator>,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig, node_id: u16) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| {
                AppError::ConfigurationError(format!("Invalid DATABASE_URL {}: {}", config.url, e))
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = config.url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory {
            1
        } else {
            config.max_connections.max(1)
        });
        if in_memory {
            // Every connection to `:memory:` is a separate database; keep the single one alive.
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to connect to {}: {}", config.url, e))
        })?;

        let db = Self {
            pool,
            ids: Arc::new(IdGenerator::new(node_id)),
        };
        db.initialize().await?;
        info!("Database ready at {}", config.url);
        Ok(db)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        Self::connect(&config, 0).await
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn initialize(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to apply schema: {}", e)))?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn next_id(&self) -> i64 {
        self.ids.next_id()
    }

    pub async fn begin(&self) -> AppResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))
    }

    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}
