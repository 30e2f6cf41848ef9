use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use parentkb_ingest::PdfFile;

use super::{api_error, collection_error, ApiError};
use crate::state::AppState;

// ── Request/Response types ────────────────────────

#[derive(Debug, Serialize)]
pub struct PdfListResponse {
    pub files: Vec<PdfFile>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub filename: String,
    pub size: usize,
    /// Indexing runs in the background after the response is sent.
    pub processing_status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub status: &'static str,
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub filename: String,
}

fn is_pdf(name: &str) -> bool {
    name.to_lowercase().ends_with(".pdf")
}

// ── Handlers ──────────────────────────────────────

pub async fn list_pdfs(State(state): State<Arc<AppState>>) -> Result<Json<PdfListResponse>, ApiError> {
    let files = state.pdfs.list().map_err(collection_error)?;
    Ok(Json(PdfListResponse { files }))
}

pub async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let field = loop {
        let next = multipart
            .next_field()
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Multipart error: {e}")))?;
        match next {
            Some(field) if field.name() == Some("file") => break field,
            Some(_) => continue,
            None => return Err(api_error(StatusCode::BAD_REQUEST, "No file provided")),
        }
    };

    let filename = field.file_name().unwrap_or_default().to_string();
    if !is_pdf(&filename) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Only PDF files are allowed"));
    }

    let bytes = field
        .bytes()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Failed to read file: {e}")))?;

    let stored = state
        .pdfs
        .save_upload(&filename, &bytes)
        .map_err(collection_error)?;

    let bg_state = state.clone();
    let bg_name = stored.clone();
    tokio::spawn(async move {
        match bg_state.qa.add_single_pdf(&bg_name).await {
            Ok(0) => warn!("Uploaded '{}' produced no indexable text", bg_name),
            Ok(chunks) => info!("Indexed uploaded '{}' ({} chunks)", bg_name, chunks),
            Err(e) => error!("Failed to index uploaded '{}': {}", bg_name, e),
        }
    });

    Ok(Json(UploadResponse {
        status: "PDF uploaded successfully",
        filename: stored,
        size: bytes.len(),
        processing_status: "pending",
    }))
}

pub async fn update_pdf(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let new_name = state
        .pdfs
        .rename(&req.old_name, &req.new_name)
        .map_err(collection_error)?;

    // Records are keyed by source, so a rename is a remove plus an add.
    if let Err(e) = state.qa.remove_single_pdf(&req.old_name).await {
        warn!("Failed to drop '{}' from the index: {}", req.old_name, e);
    }
    match state.qa.add_single_pdf(&new_name).await {
        Ok(chunks) => info!("Reindexed '{}' as '{}' ({} chunks)", req.old_name, new_name, chunks),
        Err(e) => warn!("Failed to index renamed '{}': {}", new_name, e),
    }

    Ok(Json(UpdateResponse {
        status: "PDF renamed successfully",
        old_name: req.old_name,
        new_name,
    }))
}

pub async fn delete_pdf(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let name = params.file_name;
    if !state.pdfs.exists(&name) {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("PDF file '{name}' not found"),
        ));
    }
    if !is_pdf(&name) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Only PDF files can be deleted"));
    }

    // File first: a queued upload task that runs after this finds nothing to index.
    state.pdfs.delete(&name).map_err(collection_error)?;
    match state.qa.remove_single_pdf(&name).await {
        Ok(removed) => info!("Removed {} chunks of '{}' from the index", removed, name),
        Err(e) => warn!("Failed to drop '{}' from the index: {}", name, e),
    }

    Ok(Json(DeleteResponse {
        status: "PDF deleted successfully",
        filename: name,
    }))
}
