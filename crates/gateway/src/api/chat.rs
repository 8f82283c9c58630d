//! `POST /chat`: run one turn on a thread.

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

use super::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub thread_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub thread_id: String,
    pub response: String,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state.engine.turn(&body.thread_id, &body.message).await?;
    Ok(Json(ChatResponse {
        thread_id: body.thread_id,
        response,
    }))
}
