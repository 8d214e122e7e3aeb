//! Source photo handling: where uploads come from and where they are kept.

use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use tempfile::Builder;
use tracing::{debug, error};

/// An uploaded photo whose bytes are fetched only after the size check passes
pub trait PhotoSource: Send {
    /// Size announced by the transport before download
    fn declared_size(&self) -> u64;

    fn fetch(self) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Photo whose bytes are already in memory
#[derive(Debug, Clone)]
pub struct InlinePhoto {
    bytes: Vec<u8>,
    declared_size: u64,
}

impl InlinePhoto {
    pub fn new(bytes: Vec<u8>) -> Self {
        let declared_size = bytes.len() as u64;
        Self {
            bytes,
            declared_size,
        }
    }

    /// Announce a size different from the byte count
    pub fn with_declared_size(mut self, declared_size: u64) -> Self {
        self.declared_size = declared_size;
        self
    }
}

impl PhotoSource for InlinePhoto {
    fn declared_size(&self) -> u64 {
        self.declared_size
    }

    async fn fetch(self) -> Result<Vec<u8>> {
        Ok(self.bytes)
    }
}

/// Directory holding one photo per live session
///
/// Every save gets a fresh file name, so a photo is never overwritten in place.
#[derive(Debug, Clone)]
pub struct PhotoStorage {
    root: PathBuf,
}

impl PhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist `bytes` for the given user and upload generation
    pub async fn save(&self, user_id: i64, generation: u64, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create photo directory {}", self.root.display()))?;

        let (_, path) = Builder::new()
            .prefix(&format!("{user_id}-{generation}-"))
            .suffix(".img")
            .tempfile_in(&self.root)
            .context("Failed to create photo file")?
            .keep()
            .context("Failed to keep photo file")?;

        if let Err(e) = tokio::fs::write(&path, bytes).await {
            self.discard(&path).await;
            return Err(e).with_context(|| format!("Failed to write photo {}", path.display()));
        }

        debug!(user_id, generation, path = %path.display(), "Photo stored");
        Ok(path)
    }

    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read photo {}", path.display()))
    }

    /// Delete a stored photo; failures are logged, never returned
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Photo discarded"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!(path = %path.display(), error = %e, "Failed to discard photo"),
        }
    }
}
