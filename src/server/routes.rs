//! Router assembly.

use crate::server::{handlers, AppState};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

/// Build the API router with permissive CORS, the way a local tool consumed
/// by browser frontends needs it.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/login", post(handlers::login))
        .route("/api/fetch-protected", get(handlers::fetch_protected))
        .route("/api/download-html/:url", get(handlers::download_html))
        .route("/api/session/:id", delete(handlers::delete_session))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}
