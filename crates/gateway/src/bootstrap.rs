//! AppState construction extracted from `main.rs`.
//!
//! [`build_app_state`] validates the config and wires the checkpoint store,
//! the LLM provider, the tools and the engine together. Tests call
//! [`assemble`] directly with fakes.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use tc_domain::config::{Config, ConfigSeverity};
use tc_providers::{LlmProvider, ProviderRegistry};
use tc_threads::{
    ArchiveWriter, CheckpointStore, MemoryCheckpointStore, SqliteCheckpointStore, ThreadLockMap,
    ThreadRegistry,
};
use tc_tools::ToolRegistry;

use crate::runtime::{ConversationEngine, EngineSettings};
use crate::state::AppState;

/// `storage.checkpoint_db` value that selects the in-memory store.
pub const IN_MEMORY_DB: &str = ":memory:";

const LOCK_PRUNE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }

    // ── Checkpoint store ─────────────────────────────────────────────
    let store = open_store(&config.storage.checkpoint_db)?;

    // ── LLM providers ────────────────────────────────────────────────
    let llm = ProviderRegistry::from_config(&config.llm).context("initializing LLM providers")?;
    let provider = llm.default_provider();
    match &provider {
        Some(p) => tracing::info!(
            count = llm.len(),
            providers = ?llm.list_providers(),
            default = %p.provider_id(),
            model = %p.default_model(),
            "LLM provider registry ready"
        ),
        None => tracing::info!(
            "no LLM providers initialized; configure API keys to enable /chat"
        ),
    }

    // ── Tools ────────────────────────────────────────────────────────
    let tools = tc_tools::build_default_registry(&config.tools).context("building tool registry")?;
    tracing::info!(tools = tools.len(), "tool registry ready");

    let state = assemble(config, store, provider, tools);

    // ── Periodic lock pruning ────────────────────────────────────────
    {
        let locks = state.locks.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(LOCK_PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                locks.prune_idle();
            }
        });
    }

    Ok(state)
}

/// Wire already-built parts into an [`AppState`]. The engine and the
/// registry share one lock map so deletion never interleaves with a turn.
pub fn assemble(
    config: Arc<Config>,
    store: Arc<dyn CheckpointStore>,
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
) -> AppState {
    let locks = Arc::new(ThreadLockMap::new());
    let archive = ArchiveWriter::new(config.storage.archive_dir.clone());
    tracing::info!(dir = %archive.dir().display(), "archive writer ready");

    let engine = Arc::new(ConversationEngine::new(
        store.clone(),
        provider,
        Arc::new(tools),
        locks.clone(),
        EngineSettings::from_config(&config.llm),
    ));
    let registry = Arc::new(ThreadRegistry::new(
        store.clone(),
        archive.clone(),
        locks.clone(),
    ));

    AppState {
        config,
        engine,
        registry,
        archive,
        locks,
        store,
    }
}

/// Open the SQLite store at `path`, or the in-memory store for
/// [`IN_MEMORY_DB`].
pub fn open_store(path: &Path) -> anyhow::Result<Arc<dyn CheckpointStore>> {
    if path.as_os_str() == IN_MEMORY_DB {
        tracing::warn!("using in-memory checkpoint store; threads are lost on exit");
        return Ok(Arc::new(MemoryCheckpointStore::new()));
    }
    let store = SqliteCheckpointStore::open(path)
        .with_context(|| format!("opening checkpoint db {}", path.display()))?;
    tracing::info!(path = %path.display(), "checkpoint store ready");
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_marker_selects_memory_store() {
        let store = open_store(Path::new(IN_MEMORY_DB)).unwrap();
        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sqlite_store_is_created_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("chatbot.db");
        let store = open_store(&db).unwrap();
        store.close().await.unwrap();
        assert!(db.exists());
    }
}
