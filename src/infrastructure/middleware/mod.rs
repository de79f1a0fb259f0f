// Request extractors shared by the API routers

pub mod auth;

pub use auth::{CurrentAdmin, CurrentUser, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
