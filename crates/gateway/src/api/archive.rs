//! `POST /save_chat`: export a thread's history to `<name>.txt`.

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

use super::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SaveChatRequest {
    pub thread_id: String,
    /// Defaults to the thread id.
    #[serde(default)]
    pub chat_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveChatResponse {
    pub message: String,
    pub path: String,
}

pub async fn save_chat(
    State(state): State<AppState>,
    Json(body): Json<SaveChatRequest>,
) -> Result<Json<SaveChatResponse>, ApiError> {
    if body.thread_id.is_empty() {
        return Err(ApiError::bad_request("thread_id must not be empty"));
    }
    let messages = state.engine.history(&body.thread_id).await?;
    let path = state
        .archive
        .save(&body.thread_id, &messages, body.chat_name.as_deref())
        .await?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Json(SaveChatResponse {
        message: format!("Chat saved as '{file_name}'"),
        path: path.display().to_string(),
    }))
}
