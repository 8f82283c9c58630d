//! Human-readable chat archives.
//!
//! Each archive is `<archive_dir>/<name>.txt` holding one `role: content`
//! block per message, blocks separated by a blank line. Archives are
//! point-in-time exports and are never read back into a thread.

use std::path::{Path, PathBuf};

use tc_domain::tool::Message;
use tc_domain::trace::TraceEvent;

const EXTENSION: &str = "txt";

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("invalid archive name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("archive {0:?} not found")]
    NotFound(String),
    #[error("archive io: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes, lists and removes archives under one directory.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    dir: PathBuf,
}

impl ArchiveWriter {
    /// Archives live under `dir`, created lazily on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `messages` to `<name>.txt`, overwriting any archive of the
    /// same name. `name` defaults to the thread id.
    pub async fn save(
        &self,
        thread_id: &str,
        messages: &[Message],
        name: Option<&str>,
    ) -> Result<PathBuf, ArchiveError> {
        let name = sanitize_name(name.unwrap_or(thread_id))?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(&name);
        tokio::fs::write(&path, render(messages)).await?;

        TraceEvent::ArchiveSaved {
            thread_id: thread_id.to_owned(),
            path: path.display().to_string(),
            messages: messages.len(),
        }
        .emit();

        Ok(path)
    }

    /// Raw text of one archive.
    pub async fn read(&self, name: &str) -> Result<String, ArchiveError> {
        let name = sanitize_name(name)?;
        match tokio::fs::read_to_string(self.path_for(&name)).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ArchiveError::NotFound(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove one archive by name. Returns whether a file was removed.
    pub async fn delete(&self, name: &str) -> Result<bool, ArchiveError> {
        let name = sanitize_name(name)?;
        match tokio::fs::remove_file(self.path_for(&name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every file in the archive directory whose name contains
    /// `thread_id`. Returns how many were removed.
    pub async fn delete_matching(&self, thread_id: &str) -> Result<usize, ArchiveError> {
        if thread_id.is_empty() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in self.entries().await? {
            let file_name = entry.file_name();
            if file_name.to_string_lossy().contains(thread_id) {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(removed)
    }

    /// Names (without extension) of every archive, sorted.
    pub async fn list(&self) -> Result<Vec<String>, ArchiveError> {
        let mut names: Vec<String> = self
            .entries()
            .await?
            .into_iter()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    return None;
                }
                path.file_stem().map(|s| s.to_string_lossy().into_owned())
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    /// Regular files in the archive dir; empty when the dir does not exist.
    async fn entries(&self) -> Result<Vec<tokio::fs::DirEntry>, ArchiveError> {
        let mut rd = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            if entry.file_type().await?.is_file() {
                out.push(entry);
            }
        }
        Ok(out)
    }
}

/// `role: content` blocks separated by blank lines.
pub fn render(messages: &[Message]) -> String {
    let mut out = String::new();
    for msg in messages {
        out.push_str(msg.role().as_str());
        out.push_str(": ");
        out.push_str(msg.content());
        out.push_str("\n\n");
    }
    out
}

/// Validate an archive name for use as a single path component.
///
/// A trailing `.txt` is dropped so `notes` and `notes.txt` address the
/// same file.
pub fn sanitize_name(raw: &str) -> Result<String, ArchiveError> {
    let invalid = |reason| ArchiveError::InvalidName {
        name: raw.to_owned(),
        reason,
    };

    let trimmed = raw.trim();
    let name = trimmed
        .strip_suffix(".txt")
        .unwrap_or(trimmed);

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("path separators are not allowed"));
    }
    if name == "." || name.contains("..") {
        return Err(invalid("relative path components are not allowed"));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("control characters are not allowed"));
    }
    Ok(name.to_owned())
}
