//! Conversation runtime: the turn-taking loop that threads a user message
//! through the model and the tools, checkpointing every appended message.
//!
//! Entry point: [`ConversationEngine::turn`].

pub mod tools;
pub mod turn;

use std::sync::Arc;

use tc_domain::config::LlmConfig;
use tc_domain::tool::Message;
use tc_providers::LlmProvider;
use tc_threads::{CheckpointStore, StoreError, ThreadLockMap};
use tc_tools::ToolRegistry;

/// Returned when a turn ends without a trailing assistant message.
pub const NO_RESPONSE: &str = "No response generated.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("thread_id must not be empty")]
    InvalidThread,

    /// The model call failed. Checkpoints written earlier in the turn stay.
    #[error("generation failed: {0}")]
    Generation(#[source] tc_domain::error::Error),

    #[error("tool loop limit reached ({0} generation calls)")]
    ToolLoopExceeded(usize),

    #[error("checkpoint store: {0}")]
    Store(#[from] StoreError),

    #[error("thread lock unavailable")]
    Lock,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-turn knobs lifted out of [`LlmConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_tool_loops: usize,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
}

impl EngineSettings {
    pub fn from_config(llm: &LlmConfig) -> Self {
        Self {
            max_tool_loops: llm.max_tool_loops,
            system_prompt: llm.system_prompt.clone(),
            temperature: llm.temperature,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

pub struct ConversationEngine {
    store: Arc<dyn CheckpointStore>,
    /// `None` when no provider could be initialized; turns then fail with
    /// [`TurnError::Generation`] while reads keep working.
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Arc<ToolRegistry>,
    locks: Arc<ThreadLockMap>,
    settings: EngineSettings,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        provider: Option<Arc<dyn LlmProvider>>,
        tools: Arc<ToolRegistry>,
        locks: Arc<ThreadLockMap>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            provider,
            tools,
            locks,
            settings,
        }
    }

    /// Messages of the thread's latest checkpoint; empty for unknown threads.
    pub async fn history(&self, thread_id: &str) -> Result<Vec<Message>, TurnError> {
        if thread_id.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .latest(thread_id)
            .await?
            .map(|c| c.messages)
            .unwrap_or_default())
    }
}

/// Text of the terminal assistant message, or [`NO_RESPONSE`].
pub(crate) fn final_text(messages: &[Message]) -> String {
    match messages.last() {
        Some(Message::Assistant { content, .. }) => content.clone(),
        _ => NO_RESPONSE.to_owned(),
    }
}
