//! Local staging directories for in-flight jobs.

use std::io;
use std::path::{Path, PathBuf};

use vodmill_models::ObjectName;

use crate::config::StageConfig;

/// The raw and processed staging directories.
///
/// Staged files are disposable local caches scoped to one job; the object
/// store remains the system of record.
#[derive(Debug, Clone)]
pub struct StageStore {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl StageStore {
    pub fn new(config: &StageConfig) -> Self {
        Self {
            raw_dir: config.raw_dir.clone(),
            processed_dir: config.processed_dir.clone(),
        }
    }

    /// Create both staging directories, parents included.
    ///
    /// Idempotent: directories that already exist are not an error.
    pub async fn ensure_directories(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.raw_dir).await?;
        tokio::fs::create_dir_all(&self.processed_dir).await?;
        Ok(())
    }

    /// Staged path for a raw download.
    ///
    /// Validated names contain no path separators, so distinct names map to
    /// distinct paths inside the directory.
    pub fn raw_path(&self, name: &ObjectName) -> PathBuf {
        self.raw_dir.join(name.as_str())
    }

    /// Staged path for a processed output, keyed by its derived object key.
    pub fn processed_path(&self, key: &str) -> PathBuf {
        self.processed_dir.join(key)
    }

    /// Remove a staged file if it exists, reporting whether one was removed.
    ///
    /// A missing file is a successful no-op: deletion is best-effort cleanup,
    /// not a correctness-critical operation.
    pub async fn remove_if_present(&self, path: &Path) -> io::Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
