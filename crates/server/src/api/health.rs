use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use parentkb_storage::SourceCount;

use crate::state::{AppState, SERVICE_NAME};

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct QueryCacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub initialized: bool,
    /// `None` when the index could not be read.
    pub indexed_chunks: Option<usize>,
    /// Record count per indexed PDF.
    pub documents: Option<Vec<SourceCount>>,
    pub query_cache: QueryCacheStats,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("{SERVICE_NAME} API"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let pipeline = state.qa.pipeline();
    let documents = match pipeline.index().sources().await {
        Ok(sources) => Some(sources),
        Err(e) => {
            warn!("Health check could not read the index: {}", e);
            None
        }
    };
    let indexed_chunks = documents
        .as_ref()
        .map(|docs| docs.iter().map(|d| d.chunks).sum());
    let (hits, misses) = pipeline.embeddings().cache_stats();

    Json(HealthResponse {
        status: if documents.is_some() { "healthy" } else { "degraded" },
        service: SERVICE_NAME,
        initialized: pipeline.is_initialized(),
        indexed_chunks,
        documents,
        query_cache: QueryCacheStats { hits, misses },
    })
}
