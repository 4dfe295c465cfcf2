//! Durable record of already-published article URLs.
//!
//! The on-disk format is a flat, newline-delimited list of URLs with no
//! header. Blank lines are ignored when reading. Saving rewrites the whole
//! file through a temporary sibling and a rename, so a concurrent reader
//! sees either the old list or the new one.

use crate::error::HistoryError;
use std::collections::HashSet;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// Append-only set of published article URLs.
///
/// Keeps first-seen order for the file representation and a hash index for
/// membership checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    order: Vec<String>,
    index: HashSet<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the newline-delimited file format.
    pub fn parse(text: &str) -> Self {
        text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
    }

    /// Render the newline-delimited file format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for url in &self.order {
            out.push_str(url);
            out.push('\n');
        }
        out
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains(url)
    }

    /// Add a URL. Returns `false` if it was already recorded.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.index.contains(&url) {
            return false;
        }
        self.index.insert(url.clone());
        self.order.push(url);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for History {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut history = History::new();
        for url in iter {
            history.insert(url);
        }
        history
    }
}

/// Storage backend for the published record.
pub trait HistoryStore {
    /// Read the current record. A store that has never been written is empty, not an error.
    async fn load(&self) -> Result<History, HistoryError>;

    /// Replace the persisted record with `history`.
    async fn save(&self, history: &History) -> Result<(), HistoryError>;
}

/// [`HistoryStore`] backed by a plain text file.
#[derive(Debug, Clone)]
pub struct FileHistory {
    path: PathBuf,
}

impl FileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "history".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl HistoryStore for FileHistory {
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn load(&self) -> Result<History, HistoryError> {
        match fs::read_to_string(&self.path).await {
            Ok(text) => {
                let history = History::parse(&text);
                debug!(count = history.len(), "Loaded history");
                Ok(history)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No history file yet; starting empty");
                Ok(History::new())
            }
            Err(source) => Err(HistoryError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    #[instrument(level = "debug", skip_all, fields(path = %self.path.display(), count = history.len()))]
    async fn save(&self, history: &History) -> Result<(), HistoryError> {
        let tmp = self.temp_path();
        if let Err(source) = write_then_rename(&tmp, &self.path, history.render().as_bytes()).await {
            // Leave no partial file behind.
            let _ = fs::remove_file(&tmp).await;
            return Err(HistoryError::Write {
                path: self.path.clone(),
                source,
            });
        }
        debug!("Saved history");
        Ok(())
    }
}

/// Write `contents` to `tmp`, flush it to disk, then move it over `path`.
async fn write_then_rename(tmp: &Path, path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(tmp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(tmp, path).await
}
