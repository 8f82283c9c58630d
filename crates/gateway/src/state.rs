use std::sync::Arc;

use tc_domain::config::Config;
use tc_threads::{ArchiveWriter, CheckpointStore, ThreadLockMap, ThreadRegistry};

use crate::runtime::ConversationEngine;

/// Shared application state passed to all API handlers.
///
/// Handlers own no state of their own; every request maps onto one call
/// into the engine, the registry or the archive writer.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    // ── Conversation core ─────────────────────────────────────────────
    pub engine: Arc<ConversationEngine>,
    pub registry: Arc<ThreadRegistry>,
    pub archive: ArchiveWriter,
    /// Shared by the engine and the registry.
    pub locks: Arc<ThreadLockMap>,

    /// Kept so the server can close it after graceful shutdown.
    pub store: Arc<dyn CheckpointStore>,
}
