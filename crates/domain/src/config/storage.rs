use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Storage (checkpoints + archives)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database holding every thread's checkpoint chain.
    #[serde(default = "d_checkpoint_db")]
    pub checkpoint_db: PathBuf,
    /// Directory receiving `<name>.txt` chat archives.
    #[serde(default = "d_archive_dir")]
    pub archive_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            checkpoint_db: d_checkpoint_db(),
            archive_dir: d_archive_dir(),
        }
    }
}

fn d_checkpoint_db() -> PathBuf {
    PathBuf::from("chatbot.db")
}
fn d_archive_dir() -> PathBuf {
    PathBuf::from("chat_history")
}
