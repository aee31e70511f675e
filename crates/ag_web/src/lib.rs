use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod error;
pub mod handlers;
pub mod relay;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use relay::RelayConfig;
pub use state::{AppState, DEFAULT_SESSION_IDLE_TTL};

/// Upper bound for an uploaded reference PDF.
pub const REFERENCE_UPLOAD_LIMIT: usize = 20 * 1024 * 1024;

pub async fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/plans", get(handlers::list_plans))
        .route("/api/sessions", post(handlers::create_session))
        .route("/api/sessions/:id", get(handlers::get_session).delete(handlers::delete_session))
        .route("/api/sessions/:id/titles", post(handlers::generate_titles))
        .route("/api/sessions/:id/titles/regenerate", post(handlers::regenerate_titles))
        .route("/api/sessions/:id/select", post(handlers::select_title))
        .route("/api/sessions/:id/article", post(handlers::generate_article))
        .route("/api/sessions/:id/eyecatch", post(handlers::regenerate_eyecatch))
        .route("/api/sessions/:id/content", put(handlers::edit_content))
        .route("/api/sessions/:id/back", post(handlers::back))
        .route("/api/sessions/:id/draft", post(handlers::save_draft))
        .route("/api/sessions/:id/publish", post(handlers::publish))
        .route(
            "/api/reference",
            post(handlers::extract_reference).layer(DefaultBodyLimit::max(REFERENCE_UPLOAD_LIMIT)),
        )
        .route("/api/articles", get(handlers::list_articles))
        .route(
            "/api/credentials/:user_id",
            get(handlers::get_credentials).put(handlers::put_credentials),
        )
        .route("/wp-proxy", post(relay::wp_proxy))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use ag_core::{Article, Error, Result};
    pub use crate::{create_app, AppState, RelayConfig};
}
