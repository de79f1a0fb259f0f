// Voting platform backend: users, contestants, posts, the social graph over
// them, and the admin dashboard.

// HTTP routers and request/response plumbing
pub mod api;

// Shared state handed to every handler
pub mod app_state;
pub mod config;

// SQLite persistence
pub mod database;

// Identifiers, security, extractors and external service clients
pub mod infrastructure;

// Domain records and API projections
pub mod models;

// Business operations
pub mod services;

pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
