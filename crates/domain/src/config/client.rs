use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Settings for `threadchat chat`, the terminal client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the ThreadChat API.
    #[serde(default = "d_api_base")]
    pub api_base: String,
    /// Directory holding the local conversation mirrors.
    #[serde(default = "d_mirror_dir")]
    pub mirror_dir: PathBuf,
    /// Timeout for `POST /chat` (seconds).
    #[serde(default = "d_60")]
    pub chat_timeout_secs: u64,
    /// Timeout for every other API call (seconds).
    #[serde(default = "d_10")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: d_api_base(),
            mirror_dir: d_mirror_dir(),
            chat_timeout_secs: 60,
            request_timeout_secs: 10,
        }
    }
}

fn d_api_base() -> String {
    "http://127.0.0.1:8080".into()
}
fn d_mirror_dir() -> PathBuf {
    PathBuf::from("data/uploaded_files")
}
fn d_60() -> u64 {
    60
}
fn d_10() -> u64 {
    10
}
