//! In-memory checkpoint store. Used by tests, and by the server when
//! `storage.checkpoint_db` is `:memory:`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use tc_domain::trace::TraceEvent;

use crate::checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointStore, CheckpointSummary, StoreError,
};

/// Thread id -> checkpoints ordered by step. `None` once closed.
pub struct MemoryCheckpointStore {
    threads: RwLock<Option<BTreeMap<String, Vec<Checkpoint>>>>,
}

impl Default for MemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self {
            threads: RwLock::new(Some(BTreeMap::new())),
        }
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn put(&self, checkpoint: Checkpoint) -> Result<CheckpointConfig, StoreError> {
        let config = checkpoint.config.clone();
        let event = TraceEvent::CheckpointWritten {
            thread_id: config.thread_id.clone(),
            checkpoint_id: config.checkpoint_id.clone(),
            step: checkpoint.metadata.step,
            source: checkpoint.metadata.source.as_str().to_owned(),
            messages: checkpoint.messages.len(),
        };
        {
            let mut guard = self.threads.write();
            let threads = guard.as_mut().ok_or(StoreError::Closed)?;
            let chain = threads.entry(config.thread_id.clone()).or_default();
            chain.retain(|c| c.config.checkpoint_id != config.checkpoint_id);
            let at = chain.partition_point(|c| c.metadata.step <= checkpoint.metadata.step);
            chain.insert(at, checkpoint);
        }
        event.emit();
        Ok(config)
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        let guard = self.threads.read();
        let threads = guard.as_ref().ok_or(StoreError::Closed)?;
        Ok(threads.get(thread_id).and_then(|chain| chain.last().cloned()))
    }

    async fn list(&self, thread_id: Option<&str>) -> Result<Vec<CheckpointSummary>, StoreError> {
        let guard = self.threads.read();
        let threads = guard.as_ref().ok_or(StoreError::Closed)?;
        let summaries = match thread_id {
            Some(tid) => threads
                .get(tid)
                .map(|chain| chain.iter().map(Checkpoint::summary).collect())
                .unwrap_or_default(),
            None => threads
                .values()
                .flat_map(|chain| chain.iter().map(Checkpoint::summary))
                .collect(),
        };
        Ok(summaries)
    }

    async fn delete(&self, config: &CheckpointConfig) -> Result<bool, StoreError> {
        let mut guard = self.threads.write();
        let threads = guard.as_mut().ok_or(StoreError::Closed)?;
        let Some(chain) = threads.get_mut(&config.thread_id) else {
            return Ok(false);
        };
        let before = chain.len();
        chain.retain(|c| c.config.checkpoint_id != config.checkpoint_id);
        let removed = chain.len() < before;
        if chain.is_empty() {
            threads.remove(&config.thread_id);
        }
        Ok(removed)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.threads.write().take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointSource;
    use tc_domain::tool::Message;

    #[tokio::test]
    async fn put_latest_delete() {
        let store = MemoryCheckpointStore::new();
        let first = Checkpoint::next("t", None, vec![Message::user("a")], CheckpointSource::Input);
        let second = Checkpoint::next(
            "t",
            Some(&first),
            vec![Message::user("a"), Message::assistant("b")],
            CheckpointSource::Loop,
        );
        store.put(first.clone()).await.unwrap();
        store.put(second.clone()).await.unwrap();

        assert_eq!(store.latest("t").await.unwrap(), Some(second.clone()));
        assert!(store.delete(&second.config).await.unwrap());
        assert_eq!(store.latest("t").await.unwrap(), Some(first.clone()));
        assert!(store.delete(&first.config).await.unwrap());
        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_store_rejects_calls() {
        let store = MemoryCheckpointStore::new();
        store.close().await.unwrap();
        let cp = Checkpoint::next("t", None, vec![], CheckpointSource::Input);
        assert!(matches!(store.put(cp).await, Err(StoreError::Closed)));
    }
}
