pub mod archive;
pub mod chat;
pub mod error;
pub mod threads;

use axum::response::Json;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

/// Build the API router.
///
/// Each route maps onto exactly one engine, registry or archive call.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/threads", get(threads::list_threads))
        .route("/new_thread", post(threads::new_thread))
        .route("/chat", post(chat::chat))
        .route("/history/:thread_id", get(threads::history))
        .route("/save_chat", post(archive::save_chat))
        .route("/delete_chat", delete(threads::delete_chat))
}

/// Liveness.
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Welcome to ThreadChat API" }))
}
