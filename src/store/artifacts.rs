use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;
use uuid::Uuid;

use crate::{LayoutCheckError, Result};

/// Destination for diff images; returns the URL recorded with the version.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn store_diff(&self, png: &[u8]) -> Result<String>;

    /// Remove an artifact that ended up unreferenced.
    async fn discard(&self, url: &str) -> Result<()>;
}

/// Writes `diff-<uuid>.png` files into a directory and hands back `file://` URLs.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    dir: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ArtifactSink for LocalArtifactStore {
    async fn store_diff(&self, png: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            LayoutCheckError::store(format!(
                "failed to create artifact dir {}: {e}",
                self.dir.display()
            ))
        })?;
        let dir = tokio::fs::canonicalize(&self.dir).await?;
        let path = dir.join(format!("diff-{}.png", Uuid::new_v4()));
        tokio::fs::write(&path, png).await.map_err(|e| {
            LayoutCheckError::store(format!("failed to write {}: {e}", path.display()))
        })?;

        Url::from_file_path(&path)
            .map(String::from)
            .map_err(|_| {
                LayoutCheckError::store(format!("{} is not an absolute path", path.display()))
            })
    }

    async fn discard(&self, url: &str) -> Result<()> {
        let path = Url::parse(url)
            .ok()
            .and_then(|u| u.to_file_path().ok())
            .ok_or_else(|| LayoutCheckError::store(format!("{url} is not a file URL")))?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LayoutCheckError::store(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

/// Keeps diff images in memory under `memory://diff/<n>` URLs.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    // Discarded slots stay as `None` so numbering is stable.
    blobs: Mutex<Vec<Option<Vec<u8>>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.lock().await.iter().flatten().count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ArtifactSink for MemoryArtifactStore {
    async fn store_diff(&self, png: &[u8]) -> Result<String> {
        let mut blobs = self.blobs.lock().await;
        blobs.push(Some(png.to_vec()));
        Ok(format!("memory://diff/{}", blobs.len()))
    }

    async fn discard(&self, url: &str) -> Result<()> {
        let index = url
            .strip_prefix("memory://diff/")
            .and_then(|n| n.parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(|| LayoutCheckError::store(format!("{url} is not a memory artifact")))?;
        if let Some(slot) = self.blobs.lock().await.get_mut(index) {
            *slot = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn local_store_writes_png_and_returns_file_url() {
        let dir = TempDir::new().unwrap();
        let store = LocalArtifactStore::new(dir.path().join("artifacts"));

        let url = store.store_diff(b"png-bytes").await.unwrap();
        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.scheme(), "file");

        let path = parsed.to_file_path().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("diff-") && n.ends_with(".png")));
    }

    #[tokio::test]
    async fn each_diff_gets_its_own_file() {
        let dir = TempDir::new().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let a = store.store_diff(b"a").await.unwrap();
        let b = store.store_diff(b"b").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn memory_store_numbers_blobs() {
        let store = MemoryArtifactStore::new();
        assert!(store.is_empty().await);
        assert_eq!(store.store_diff(b"x").await.unwrap(), "memory://diff/1");
        assert_eq!(store.store_diff(b"y").await.unwrap(), "memory://diff/2");
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn discard_removes_local_file() {
        let dir = TempDir::new().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let url = store.store_diff(b"png").await.unwrap();
        let path = Url::parse(&url).unwrap().to_file_path().unwrap();

        store.discard(&url).await.unwrap();
        assert!(!path.exists());
        store.discard(&url).await.unwrap();
    }

    #[tokio::test]
    async fn discard_frees_memory_slot_but_keeps_numbering() {
        let store = MemoryArtifactStore::new();
        let first = store.store_diff(b"x").await.unwrap();
        store.discard(&first).await.unwrap();
        assert!(store.is_empty().await);
        assert_eq!(store.store_diff(b"y").await.unwrap(), "memory://diff/2");
        assert!(store.discard("file:///nope.png").await.is_err());
    }
}
