//! Thread registry.
//!
//! Thread ids have no creation record: the set of known threads is derived
//! by scanning checkpoint configs. Minting an id writes nothing; the thread
//! comes into existence with its first checkpoint.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use tc_domain::trace::TraceEvent;

use crate::archive::{ArchiveError, ArchiveWriter};
use crate::checkpoint::{CheckpointStore, StoreError};
use crate::lock::ThreadLockMap;
use crate::ThreadId;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("thread lock unavailable")]
    Lock,
}

/// What `delete_thread` removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub checkpoints: usize,
    pub archives: usize,
}

pub struct ThreadRegistry {
    store: Arc<dyn CheckpointStore>,
    archive: ArchiveWriter,
    locks: Arc<ThreadLockMap>,
}

impl ThreadRegistry {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        archive: ArchiveWriter,
        locks: Arc<ThreadLockMap>,
    ) -> Self {
        Self {
            store,
            archive,
            locks,
        }
    }

    /// Every thread id with at least one checkpoint, deduplicated and
    /// sorted.
    pub async fn list_threads(&self) -> Result<Vec<ThreadId>, RegistryError> {
        let ids: BTreeSet<ThreadId> = self
            .store
            .list(None)
            .await?
            .into_iter()
            .map(|s| s.config.thread_id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    /// A fresh UUID v4. Nothing is persisted.
    pub fn new_thread_id(&self) -> ThreadId {
        uuid::Uuid::new_v4().to_string()
    }

    /// Remove every checkpoint of `thread_id` and every archive whose file
    /// name contains it. Unknown threads yield an empty report.
    pub async fn delete_thread(&self, thread_id: &str) -> Result<DeleteReport, RegistryError> {
        if thread_id.is_empty() {
            return Ok(DeleteReport::default());
        }
        let _permit = self
            .locks
            .acquire(thread_id)
            .await
            .map_err(|_| RegistryError::Lock)?;

        let mut report = DeleteReport::default();
        for summary in self.store.list(Some(thread_id)).await? {
            if self.store.delete(&summary.config).await? {
                report.checkpoints += 1;
            }
        }
        report.archives = self.archive.delete_matching(thread_id).await?;

        tracing::debug!(
            thread_id,
            checkpoints = report.checkpoints,
            archives = report.archives,
            "thread deleted"
        );
        TraceEvent::ThreadDeleted {
            thread_id: thread_id.to_owned(),
            checkpoints: report.checkpoints,
            archives: report.archives,
        }
        .emit();

        Ok(report)
    }
}
