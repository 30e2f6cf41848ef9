//! Parent dashboard API endpoints.
//!
//! Handlers return `Result<Json<_>, ApiError>`; errors serialize as
//! `{"detail": "..."}`.

mod ask;
mod health;
mod pdfs;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use parentkb_ingest::CollectionError;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

/// Map file-management failures onto HTTP status codes.
pub(crate) fn collection_error(err: CollectionError) -> ApiError {
    let status = match &err {
        CollectionError::InvalidName(_)
        | CollectionError::NotPdf(_)
        | CollectionError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
        CollectionError::NotFound(_) => StatusCode::NOT_FOUND,
        CollectionError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, err.to_string())
}

// ── Re-exports ───────────────────────────────────────────────────

pub use ask::{ask, reload};
pub use health::{health, root};
pub use pdfs::{delete_pdf, list_pdfs, update_pdf, upload_pdf};
