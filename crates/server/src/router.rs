//! HTTP router construction.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::api;
use crate::state::AppState;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub fn build_router(state: Arc<AppState>, cors_origin: &str) -> Router {
    let dashboard = Router::new()
        .route("/ask", post(api::ask))
        .route("/reload", post(api::reload))
        .route("/health", get(api::health))
        .route("/pdfs", get(api::list_pdfs))
        .route("/pdfs/upload", post(api::upload_pdf))
        .route("/pdfs/update", put(api::update_pdf))
        .route("/pdfs/delete", delete(api::delete_pdf));

    Router::new()
        .route("/", get(api::root))
        .nest("/parentdashboard", dashboard)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!("Invalid CORS_ORIGIN '{}', allowing any origin", origin);
            CorsLayer::permissive()
        }
    }
}
