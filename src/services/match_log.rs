use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::models::image::ImageKey;
use crate::models::report::LogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Written,
    /// Dedupe is on and the key was already logged.
    Duplicate,
}

/// Append-only match log, one `"<key>: <text>"` line per entry.
///
/// Every append is flushed before returning. With dedupe enabled the keys
/// already present in the file are loaded at open and repeats are skipped;
/// otherwise a redelivered message produces a second line.
///
/// Carriage returns and newlines inside the extracted text are written as
/// spaces, so every entry stays on a single line.
pub struct MatchLog {
    path: PathBuf,
    file: File,
    logged: Option<HashSet<ImageKey>>,
}

impl MatchLog {
    pub async fn open(path: impl AsRef<Path>, dedupe: bool) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|source| LogError::Open {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let logged = if dedupe {
            Some(load_logged_keys(&path).await?)
        } else {
            None
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self { path, file, logged })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&mut self, entry: &LogEntry) -> Result<AppendOutcome, LogError> {
        if let Some(logged) = &self.logged {
            if logged.contains(&entry.image_key) {
                return Ok(AppendOutcome::Duplicate);
            }
        }

        let line = format!("{}\n", entry.to_string().replace(['\r', '\n'], " "));
        self.file.write_all(line.as_bytes()).await.map_err(LogError::Write)?;
        self.file.flush().await.map_err(LogError::Write)?;

        if let Some(logged) = &mut self.logged {
            logged.insert(entry.image_key.clone());
        }
        Ok(AppendOutcome::Written)
    }

    /// Flush and sync to disk.
    pub async fn close(mut self) -> Result<(), LogError> {
        self.file.flush().await.map_err(LogError::Write)?;
        self.file.sync_all().await.map_err(LogError::Write)?;
        Ok(())
    }
}

async fn load_logged_keys(path: &Path) -> Result<HashSet<ImageKey>, LogError> {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(source) => {
            return Err(LogError::Open {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    Ok(contents
        .lines()
        .filter_map(|line| line.split_once(": "))
        .map(|(key, _)| ImageKey::new(key))
        .collect())
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Failed to open match log {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write match log: {0}")]
    Write(std::io::Error),
}
