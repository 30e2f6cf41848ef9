use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use parentkb_rag::IndexReport;

use super::{api_error, ApiError};
use crate::state::AppState;

pub const MAX_QUESTION_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub status: &'static str,
    pub report: IndexReport,
}

/// Trimmed question, 1 to 1000 characters.
fn validate_question(raw: &str) -> Result<&str, ApiError> {
    let question = raw.trim();
    if question.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Question cannot be empty"));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Question must be at most {MAX_QUESTION_CHARS} characters"),
        ));
    }
    Ok(question)
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = validate_question(&req.question)?;
    info!("Received question ({} chars)", question.chars().count());

    let answer = state.qa.answer_question(question).await.map_err(|e| {
        error!("Error processing question: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error processing question: {e}"),
        )
    })?;

    Ok(Json(AskResponse {
        answer: answer.answer,
    }))
}

pub async fn reload(State(state): State<Arc<AppState>>) -> Result<Json<ReloadResponse>, ApiError> {
    let report = state.qa.reload_knowledge_base().await.map_err(|e| {
        error!("Knowledge base reload failed: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error reloading knowledge base: {e}"),
        )
    })?;

    Ok(Json(ReloadResponse {
        status: "Knowledge base reloaded successfully",
        report,
    }))
}
