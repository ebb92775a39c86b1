//! On-disk storage of cache entries.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use crate::config::ClientConfig;

use super::key::{CacheKey, Root};

/// Distinguishes temporary files written concurrently by this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Maps cache keys to files under two roots and reads and writes them.
///
/// Holds no state beyond the roots; everything else is on disk. Roots are
/// created as given and no file attributes are set, so a hidden cache is
/// one whose roots are hidden by name, e.g. `.reading-buses/cache` on Unix
/// (see [`ClientConfig::with_cache_dir`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    reference_root: PathBuf,
    archive_root: PathBuf,
}

impl CacheStore {
    pub fn new(reference_root: impl Into<PathBuf>, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            reference_root: reference_root.into(),
            archive_root: archive_root.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.cache_root, &config.archive_root)
    }

    pub fn root(&self, root: Root) -> &Path {
        match root {
            Root::Reference => &self.reference_root,
            Root::Archive => &self.archive_root,
        }
    }

    /// Where `key` is stored. Pure: touches nothing on disk.
    pub fn location_for(&self, key: &CacheKey) -> PathBuf {
        self.root(key.kind.root()).join(key.file_name())
    }

    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    pub async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    /// Replace the entry at `path` with `payload`.
    ///
    /// Writes a sibling temporary file and renames it over the target, so a
    /// reader sees either the old entry or the new one. Creates the parent
    /// directory if needed.
    pub async fn write(&self, path: &Path, payload: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = temp_path(path);
        if let Err(e) = tokio::fs::write(&temp, payload).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&temp, path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
        Ok(())
    }

    /// Remove the entry at `path`. Missing entries are fine.
    pub async fn delete(&self, path: &Path) -> io::Result<()> {
        match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Age of the entry at `path` relative to `now`.
    ///
    /// Uses the creation time where the filesystem reports it, otherwise the
    /// modification time. Timestamps in the future count as age zero.
    pub async fn age(&self, path: &Path, now: SystemTime) -> io::Result<Duration> {
        let metadata = tokio::fs::metadata(path).await?;
        let written = metadata.created().or_else(|_| metadata.modified())?;
        Ok(now.duration_since(written).unwrap_or(Duration::ZERO))
    }

    /// Remove both roots and everything under them.
    pub async fn clear(&self) -> io::Result<()> {
        for root in [&self.reference_root, &self.archive_root] {
            match tokio::fs::remove_dir_all(root).await {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{n}.tmp", std::process::id()));
    path.with_file_name(name)
}
