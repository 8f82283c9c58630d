//! Thread lifecycle endpoints: list, mint, read history, delete.

use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use tc_domain::tool::Message;

use crate::state::AppState;

use super::error::ApiError;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /threads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize, Deserialize)]
pub struct ThreadListResponse {
    pub threads: Vec<String>,
}

pub async fn list_threads(
    State(state): State<AppState>,
) -> Result<Json<ThreadListResponse>, ApiError> {
    let threads = state.registry.list_threads().await?;
    Ok(Json(ThreadListResponse { threads }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /new_thread
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize, Deserialize)]
pub struct NewThreadResponse {
    pub thread_id: String,
    pub message: String,
}

/// Mint a thread id. Nothing is written until the first chat turn.
pub async fn new_thread(State(state): State<AppState>) -> Json<NewThreadResponse> {
    Json(NewThreadResponse {
        thread_id: state.registry.new_thread_id(),
        message: "New thread created".into(),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /history/:thread_id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for HistoryMessage {
    fn from(m: &Message) -> Self {
        Self {
            role: m.role().as_str().to_owned(),
            content: m.content().to_owned(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub thread_id: String,
    pub history: Vec<HistoryMessage>,
}

/// Every stored message with its real role: `user`, `assistant` or `tool`.
/// Tool results keep the `tool` role instead of being folded into
/// `assistant`, and an assistant message that only requested tools appears
/// with empty content. Clients that expect two roles must filter.
pub async fn history(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state.engine.history(&thread_id).await?;
    Ok(Json(HistoryResponse {
        history: messages.iter().map(HistoryMessage::from).collect(),
        thread_id,
    }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DELETE /delete_chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct DeleteChatRequest {
    pub thread_id: String,
}

/// Remove every checkpoint and archive of a thread. Unknown ids succeed.
pub async fn delete_chat(
    State(state): State<AppState>,
    Json(body): Json<DeleteChatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = state.registry.delete_thread(&body.thread_id).await?;
    Ok(Json(serde_json::json!({
        "message": format!("Chat {} deleted successfully", body.thread_id),
        "deleted": report,
    })))
}
