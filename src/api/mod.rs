// HTTP surface: one sub-router per area, all mounted under /api/v1.

pub mod admin;
pub mod billing;
pub mod cookies;
pub mod extract;
pub mod highlights;
pub mod multipart;
pub mod notifications;
pub mod posts;
pub mod response;
pub mod social;
pub mod users;
pub mod verification;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::warn;

use crate::app_state::AppState;
use crate::error::AppResult;

pub use response::ApiResponse;

async fn health(State(state): State<AppState>) -> AppResult<Json<Value>> {
    state.db.health_check().await?;
    Ok(Json(json!({ "status": "ok" })))
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!(origin, "CORS_ORIGIN is not a valid header value; cross-origin requests will be refused");
            cors
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/users", users::router())
        .nest("/posts", posts::router())
        .nest("/follows", social::follows_router())
        .nest("/likes", social::likes_router())
        .nest("/saved", social::saved_router())
        .nest("/votes", social::votes_router())
        .nest("/highlights", highlights::router())
        .nest("/notifications", notifications::router())
        .nest("/subscriptions", billing::subscriptions_router())
        .nest("/billing", billing::webhook_router())
        .nest("/verification", verification::router())
        .nest("/admin", admin::router())
        .nest("/dashboard", admin::dashboard_router());

    let config = state.config.clone();
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/v1", api)
        .nest_service("/public", ServeDir::new(&config.media.local_dir))
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server.cors_origin))
        .with_state(state)
}
