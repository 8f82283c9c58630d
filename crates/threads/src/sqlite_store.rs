//! SQLite-backed checkpoint store.
//!
//! One connection behind a mutex gives single-writer discipline; every
//! statement runs on the blocking pool so the tokio workers never wait on
//! disk. The connection slot is emptied by `close()`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use tc_domain::trace::TraceEvent;

use crate::checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSource, CheckpointStore,
    CheckpointSummary, StoreError,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id            TEXT NOT NULL,
    checkpoint_id        TEXT NOT NULL,
    parent_checkpoint_id TEXT,
    step                 INTEGER NOT NULL,
    source               TEXT NOT NULL,
    created_at           TEXT NOT NULL,
    messages             TEXT NOT NULL,
    PRIMARY KEY (thread_id, checkpoint_id)
);
CREATE INDEX IF NOT EXISTS idx_checkpoints_thread_step
    ON checkpoints (thread_id, step);
";

pub struct SqliteCheckpointStore {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteCheckpointStore {
    /// Open (or create) the database at `path`, creating parent
    /// directories as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = Self::init(conn)?;
        tracing::info!(path = %path.display(), "checkpoint store opened");
        Ok(store)
    }

    /// A private in-memory database; contents vanish on close.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            let conn = guard.as_ref().ok_or(StoreError::Closed)?;
            f(conn)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

/// Raw column values before JSON/time decoding.
struct Row {
    thread_id: String,
    checkpoint_id: String,
    parent_checkpoint_id: Option<String>,
    step: i64,
    source: String,
    created_at: String,
}

impl Row {
    fn from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            thread_id: row.get(0)?,
            checkpoint_id: row.get(1)?,
            parent_checkpoint_id: row.get(2)?,
            step: row.get(3)?,
            source: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_summary(self) -> Result<CheckpointSummary, StoreError> {
        let source = CheckpointSource::parse(&self.source)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown source {:?}", self.source)))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StoreError::Corrupt(format!("created_at: {e}")))?
            .with_timezone(&Utc);
        let step = u64::try_from(self.step)
            .map_err(|_| StoreError::Corrupt(format!("negative step {}", self.step)))?;
        Ok(CheckpointSummary {
            config: CheckpointConfig {
                thread_id: self.thread_id,
                checkpoint_id: self.checkpoint_id,
                parent_checkpoint_id: self.parent_checkpoint_id,
            },
            metadata: CheckpointMetadata {
                step,
                source,
                created_at,
            },
        })
    }
}

const COLUMNS: &str =
    "thread_id, checkpoint_id, parent_checkpoint_id, step, source, created_at";

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn put(&self, checkpoint: Checkpoint) -> Result<CheckpointConfig, StoreError> {
        let messages = serde_json::to_string(&checkpoint.messages)?;
        let message_count = checkpoint.messages.len();
        let cp = checkpoint.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO checkpoints \
                 (thread_id, checkpoint_id, parent_checkpoint_id, step, source, created_at, messages) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    cp.config.thread_id,
                    cp.config.checkpoint_id,
                    cp.config.parent_checkpoint_id,
                    cp.metadata.step as i64,
                    cp.metadata.source.as_str(),
                    cp.metadata.created_at.to_rfc3339(),
                    messages,
                ],
            )?;
            Ok(())
        })
        .await?;

        TraceEvent::CheckpointWritten {
            thread_id: checkpoint.config.thread_id.clone(),
            checkpoint_id: checkpoint.config.checkpoint_id.clone(),
            step: checkpoint.metadata.step,
            source: checkpoint.metadata.source.as_str().to_owned(),
            messages: message_count,
        }
        .emit();

        Ok(checkpoint.config)
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        let thread_id = thread_id.to_owned();
        self.with_conn(move |conn| {
            let found = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS}, messages FROM checkpoints \
                         WHERE thread_id = ?1 ORDER BY step DESC, checkpoint_id DESC LIMIT 1"
                    ),
                    params![thread_id],
                    |row| Ok((Row::from_sql(row)?, row.get::<_, String>(6)?)),
                )
                .optional()?;
            let Some((row, messages)) = found else {
                return Ok(None);
            };
            let summary = row.into_summary()?;
            Ok(Some(Checkpoint {
                config: summary.config,
                metadata: summary.metadata,
                messages: serde_json::from_str(&messages)?,
            }))
        })
        .await
    }

    async fn list(&self, thread_id: Option<&str>) -> Result<Vec<CheckpointSummary>, StoreError> {
        let thread_id = thread_id.map(str::to_owned);
        self.with_conn(move |conn| {
            let rows: Vec<Row> = match &thread_id {
                Some(tid) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {COLUMNS} FROM checkpoints WHERE thread_id = ?1 \
                         ORDER BY step, checkpoint_id"
                    ))?;
                    let rows = stmt
                        .query_map(params![tid], Row::from_sql)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {COLUMNS} FROM checkpoints ORDER BY thread_id, step, checkpoint_id"
                    ))?;
                    let rows = stmt
                        .query_map([], Row::from_sql)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
            };
            rows.into_iter().map(Row::into_summary).collect()
        })
        .await
    }

    async fn delete(&self, config: &CheckpointConfig) -> Result<bool, StoreError> {
        let config = config.clone();
        self.with_conn(move |conn| {
            let n = conn.execute(
                "DELETE FROM checkpoints WHERE thread_id = ?1 AND checkpoint_id = ?2",
                params![config.thread_id, config.checkpoint_id],
            )?;
            Ok(n > 0)
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let taken = conn.lock().take();
            match taken {
                Some(c) => c.close().map_err(|(_, e)| StoreError::Sqlite(e)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))??;
        tracing::info!("checkpoint store closed");
        Ok(())
    }
}
