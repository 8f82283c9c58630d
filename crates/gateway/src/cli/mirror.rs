//! Local conversation mirrors kept by the terminal client.
//!
//! One JSON file per conversation, `history_<safe title>_<thread id>.json`,
//! holding `{title, thread_id, messages, updated_at}`. These are separate
//! from the server's checkpoints and archives and survive a server reset.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

const TITLE_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorMessage {
    pub role: String,
    pub content: String,
}

impl MirrorMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_owned(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorFile {
    pub title: String,
    pub thread_id: String,
    pub messages: Vec<MirrorMessage>,
    #[serde(default)]
    pub updated_at: String,
}

/// One row of [`LocalMirror::list`].
#[derive(Debug, Clone)]
pub struct MirrorEntry {
    pub file: String,
    pub title: String,
    pub thread_id: String,
    pub updated_at: String,
}

pub struct LocalMirror {
    dir: PathBuf,
}

impl LocalMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write (or overwrite) the mirror for `thread_id`. Returns the file name.
    pub fn save(
        &self,
        title: &str,
        thread_id: &str,
        messages: &[MirrorMessage],
    ) -> anyhow::Result<String> {
        let file = file_name(title, thread_id);
        let data = MirrorFile {
            title: title.to_owned(),
            thread_id: thread_id.to_owned(),
            messages: messages.to_vec(),
            updated_at: timestamp(chrono::Utc::now()),
        };
        self.write(&file, &data)?;
        Ok(file)
    }

    /// Every readable mirror, newest first.
    pub fn list(&self) -> anyhow::Result<Vec<MirrorEntry>> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context(format!("reading {}", self.dir.display())),
        };

        let mut items = Vec::new();
        for entry in read_dir.flatten() {
            let file = entry.file_name().to_string_lossy().into_owned();
            if !file.ends_with(".json") {
                continue;
            }
            match self.load(&file) {
                Ok(data) => {
                    // Files written by hand may lack a timestamp.
                    let updated_at = if data.updated_at.is_empty() {
                        entry
                            .metadata()
                            .and_then(|m| m.modified())
                            .map(|t| timestamp(t.into()))
                            .unwrap_or_default()
                    } else {
                        data.updated_at
                    };
                    items.push(MirrorEntry {
                        file,
                        title: data.title,
                        thread_id: data.thread_id,
                        updated_at,
                    });
                }
                Err(e) => tracing::debug!(file = %file, error = %e, "skipping unreadable mirror"),
            }
        }
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(items)
    }

    pub fn load(&self, file: &str) -> anyhow::Result<MirrorFile> {
        let path = self.dir.join(file);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn delete(&self, file: &str) -> anyhow::Result<()> {
        let path = self.dir.join(file);
        std::fs::remove_file(&path).with_context(|| format!("deleting {}", path.display()))
    }

    /// Retitle a mirror. The file is renamed to match; returns the new name.
    pub fn rename(&self, file: &str, new_title: &str) -> anyhow::Result<String> {
        let mut data = self.load(file)?;
        data.title = new_title.to_owned();
        let new_file = file_name(new_title, &data.thread_id);
        self.write(&new_file, &data)?;
        if new_file != file {
            self.delete(file)?;
        }
        Ok(new_file)
    }

    fn write(&self, file: &str, data: &MirrorFile) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.dir.join(file);
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))
    }
}

/// Replace anything outside `[A-Za-z0-9_-]` with `_`, trim underscores,
/// cap at 40 chars. Never empty.
pub fn safe_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed: String = replaced
        .trim_matches('_')
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect();
    if trimmed.is_empty() {
        "untitled".to_owned()
    } else {
        trimmed
    }
}

/// Fixed-width UTC timestamp, so string order is time order.
fn timestamp(t: chrono::DateTime<chrono::Utc>) -> String {
    t.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub fn file_name(title: &str, thread_id: &str) -> String {
    format!("history_{}_{thread_id}.json", safe_title(title))
}

/// Title for a new mirror: the first user message, truncated.
pub fn title_for(messages: &[MirrorMessage]) -> String {
    messages
        .iter()
        .find(|m| m.role == "user")
        .map(|m| m.content.chars().take(TITLE_MAX_CHARS).collect::<String>())
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Chat".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_title_rules() {
        assert_eq!(safe_title("Hello, world!"), "Hello__world");
        assert_eq!(safe_title("  ??  "), "untitled");
        assert_eq!(safe_title("a-b_c"), "a-b_c");
        assert_eq!(safe_title(&"x".repeat(60)).len(), 40);
        assert_eq!(safe_title("café"), "caf");
    }

    #[test]
    fn title_comes_from_first_user_message() {
        let msgs = vec![
            MirrorMessage::new("assistant", "welcome"),
            MirrorMessage::new("user", "What is the tallest mountain on the planet Earth today?"),
        ];
        assert_eq!(title_for(&msgs).chars().count(), 40);
        assert_eq!(title_for(&[]), "Chat");
    }

    #[test]
    fn save_list_rename_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = LocalMirror::new(dir.path().join("mirrors"));
        assert!(mirror.list().unwrap().is_empty());

        let msgs = vec![
            MirrorMessage::new("user", "hi"),
            MirrorMessage::new("assistant", "hello"),
        ];
        let first = mirror.save("first chat", "t-1", &msgs).unwrap();
        assert_eq!(first, "history_first_chat_t-1.json");
        std::thread::sleep(std::time::Duration::from_millis(5));
        mirror.save("second", "t-2", &msgs).unwrap();

        let listed = mirror.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].thread_id, "t-2");

        let renamed = mirror.rename(&first, "renamed").unwrap();
        assert_eq!(renamed, "history_renamed_t-1.json");
        assert!(!dir.path().join("mirrors").join(&first).exists());
        let loaded = mirror.load(&renamed).unwrap();
        assert_eq!(loaded.title, "renamed");
        assert_eq!(loaded.messages, msgs);

        mirror.delete(&renamed).unwrap();
        assert_eq!(mirror.list().unwrap().len(), 1);
    }

    #[test]
    fn resaving_same_thread_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = LocalMirror::new(dir.path());
        mirror.save("t", "t-1", &[MirrorMessage::new("user", "a")]).unwrap();
        mirror
            .save("t", "t-1", &[MirrorMessage::new("user", "a"), MirrorMessage::new("assistant", "b")])
            .unwrap();
        let listed = mirror.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(mirror.load(&listed[0].file).unwrap().messages.len(), 2);
    }
}
