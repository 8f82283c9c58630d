use serde::Serialize;

/// Structured trace events emitted across all ThreadChat crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    CheckpointWritten {
        thread_id: String,
        checkpoint_id: String,
        step: u64,
        source: String,
        messages: usize,
    },
    ThreadDeleted {
        thread_id: String,
        checkpoints: usize,
        archives: usize,
    },
    ArchiveSaved {
        thread_id: String,
        path: String,
        messages: usize,
    },
    ToolInvoked {
        tool_name: String,
        duration_ms: u64,
        is_error: bool,
    },
    LlmRequest {
        provider: String,
        model: String,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    TurnCompleted {
        thread_id: String,
        generations: usize,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "tc_event");
    }
}
