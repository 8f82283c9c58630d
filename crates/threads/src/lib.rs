//! Thread lifecycle for ThreadChat.
//!
//! A thread exists once at least one checkpoint has been written under its
//! identifier. This crate owns the checkpoint store (SQLite and in-memory),
//! the registry that derives, mints and deletes thread ids, the per-thread
//! lock map, and the archive writer for `<name>.txt` exports.

pub mod archive;
pub mod checkpoint;
pub mod lock;
pub mod memory_store;
pub mod registry;
pub mod sqlite_store;

pub use archive::{ArchiveError, ArchiveWriter};
pub use checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSource, CheckpointStore,
    CheckpointSummary, StoreError,
};
pub use lock::{ThreadLockMap, ThreadPermit};
pub use memory_store::MemoryCheckpointStore;
pub use registry::{DeleteReport, RegistryError, ThreadRegistry};
pub use sqlite_store::SqliteCheckpointStore;

/// Opaque thread identifier (hyphenated UUID v4 when minted here).
pub type ThreadId = String;
