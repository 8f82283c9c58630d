//! Checkpoint model and the store capability.
//!
//! A checkpoint is a full snapshot of a thread's messages at one step.
//! Snapshots for one thread form a single chain linked through
//! `parent_checkpoint_id`; the thread's current state is the checkpoint
//! with the greatest `step`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tc_domain::tool::Message;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Checkpoint
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Addressing information for one checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    pub thread_id: String,
    pub checkpoint_id: String,
    #[serde(default)]
    pub parent_checkpoint_id: Option<String>,
}

/// What appended the message that produced this checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointSource {
    /// A user message entered the thread.
    Input,
    /// The turn loop appended an assistant or tool message.
    Loop,
}

impl CheckpointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Loop => "loop",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input" => Some(Self::Input),
            "loop" => Some(Self::Loop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub step: u64,
    pub source: CheckpointSource,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub config: CheckpointConfig,
    pub metadata: CheckpointMetadata,
    pub messages: Vec<Message>,
}

/// Config and metadata without the message payload; what listings return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSummary {
    pub config: CheckpointConfig,
    pub metadata: CheckpointMetadata,
}

impl Checkpoint {
    /// Build the next snapshot in `thread_id`'s chain.
    ///
    /// With no parent this is step 0. Checkpoint ids are UUID v7, so they
    /// sort in creation order.
    pub fn next(
        thread_id: &str,
        parent: Option<&Checkpoint>,
        messages: Vec<Message>,
        source: CheckpointSource,
    ) -> Self {
        let step = parent.map_or(0, |p| p.metadata.step + 1);
        Self {
            config: CheckpointConfig {
                thread_id: thread_id.to_owned(),
                checkpoint_id: uuid::Uuid::now_v7().to_string(),
                parent_checkpoint_id: parent.map(|p| p.config.checkpoint_id.clone()),
            },
            metadata: CheckpointMetadata {
                step,
                source,
                created_at: Utc::now(),
            },
            messages,
        }
    }

    pub fn summary(&self) -> CheckpointSummary {
        CheckpointSummary {
            config: self.config.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store capability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("checkpoint store is closed")]
    Closed,
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serializing checkpoint: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt checkpoint row: {0}")]
    Corrupt(String),
    #[error("store task failed: {0}")]
    Join(String),
}

/// Durable append-only store of conversation snapshots.
///
/// Implementations must be safe to share between request handlers; the
/// store handle is constructed once and injected wherever it is needed.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a checkpoint. Returns its config.
    async fn put(&self, checkpoint: Checkpoint) -> Result<CheckpointConfig, StoreError>;

    /// The checkpoint with the greatest step for `thread_id`, if any.
    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, StoreError>;

    /// Summaries of every checkpoint, or only those of one thread.
    /// Ordered by thread id, then step.
    async fn list(&self, thread_id: Option<&str>) -> Result<Vec<CheckpointSummary>, StoreError>;

    /// Remove the checkpoint addressed by `config`. Returns whether a row
    /// was removed.
    async fn delete(&self, config: &CheckpointConfig) -> Result<bool, StoreError>;

    /// Release the underlying resources. Every later call fails with
    /// [`StoreError::Closed`]. Closing twice is a no-op.
    async fn close(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_links_parent_and_increments_step() {
        let first = Checkpoint::next("t1", None, vec![Message::user("hi")], CheckpointSource::Input);
        assert_eq!(first.metadata.step, 0);
        assert!(first.config.parent_checkpoint_id.is_none());

        let second = Checkpoint::next(
            "t1",
            Some(&first),
            vec![Message::user("hi"), Message::assistant("hello")],
            CheckpointSource::Loop,
        );
        assert_eq!(second.metadata.step, 1);
        assert_eq!(
            second.config.parent_checkpoint_id.as_deref(),
            Some(first.config.checkpoint_id.as_str())
        );
        assert_ne!(second.config.checkpoint_id, first.config.checkpoint_id);
    }

    #[test]
    fn source_serializes_lowercase() {
        let json = serde_json::to_string(&CheckpointSource::Loop).unwrap();
        assert_eq!(json, "\"loop\"");
        assert_eq!(CheckpointSource::parse("input"), Some(CheckpointSource::Input));
        assert_eq!(CheckpointSource::parse("update"), None);
    }
}
