//! Persistence of check results: one config per
//! `(website_url, figma_url, figma_token, project)` and a single mutable
//! version record pointing at the latest diff image.

mod artifacts;
mod file;
mod memory;
mod models;
mod state;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

pub use artifacts::{ArtifactSink, LocalArtifactStore, MemoryArtifactStore};
pub use file::FileRepository;
pub use memory::MemoryRepository;
pub use models::{
    CheckKey, LayoutCheckConfig, LayoutCheckVersion, RecordOutcome, INITIAL_VERSION,
};
pub use state::StoreState;

use crate::config::StorageConfig;
use crate::Result;

/// Storage boundary for check configs and their version record.
#[async_trait]
pub trait CheckRepository: Send + Sync {
    async fn find_config(&self, key: &CheckKey) -> Result<Option<LayoutCheckConfig>>;

    async fn find_version(&self, config_id: Uuid) -> Result<Option<LayoutCheckVersion>>;

    /// Insert a new config together with its first version.
    async fn create_config_and_version(
        &self,
        config: LayoutCheckConfig,
        version: LayoutCheckVersion,
    ) -> Result<()>;

    /// Attach a first version to an existing config that has none.
    async fn create_version(&self, version: LayoutCheckVersion) -> Result<()>;

    async fn update_version(&self, version: &LayoutCheckVersion) -> Result<()>;
}

pub struct CheckResultStore {
    repository: Arc<dyn CheckRepository>,
    artifacts: Arc<dyn ArtifactSink>,
    // find-then-write must not interleave within a process
    record_lock: Mutex<()>,
}

impl CheckResultStore {
    pub fn new(repository: Arc<dyn CheckRepository>, artifacts: Arc<dyn ArtifactSink>) -> Self {
        Self {
            repository,
            artifacts,
            record_lock: Mutex::new(()),
        }
    }

    /// JSON state file plus a local artifact directory.
    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(
            Arc::new(FileRepository::new(storage.state_file.clone())),
            Arc::new(LocalArtifactStore::new(storage.artifacts_dir.clone())),
        )
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryRepository::new()),
            Arc::new(MemoryArtifactStore::new()),
        )
    }

    /// Upload the diff image, then record its URL under `key`.
    pub async fn record_diff(&self, key: &CheckKey, diff_png: &[u8]) -> Result<RecordOutcome> {
        let url = self.artifacts.store_diff(diff_png).await?;
        match self.record(key, url.clone()).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if let Err(cleanup) = self.artifacts.discard(&url).await {
                    warn!(url = %url, error = %cleanup, "failed to discard diff artifact");
                }
                Err(err)
            }
        }
    }

    /// Create config + version "1", or point the existing version at
    /// `diff_pixel_url` and bump it.
    pub async fn record(&self, key: &CheckKey, diff_pixel_url: String) -> Result<RecordOutcome> {
        let _guard = self.record_lock.lock().await;

        let Some(config) = self.repository.find_config(key).await? else {
            let config = LayoutCheckConfig::new(key);
            let version = LayoutCheckVersion::first(config.id, diff_pixel_url);
            let outcome = RecordOutcome {
                config_id: config.id,
                version: version.version.clone(),
                diff_pixel_url: version.diff_pixel_url.clone(),
                created: true,
            };
            self.repository
                .create_config_and_version(config, version)
                .await?;
            info!(config_id = %outcome.config_id, "created layout check config");
            return Ok(outcome);
        };

        let version = match self.repository.find_version(config.id).await? {
            Some(mut version) => {
                version.advance(diff_pixel_url)?;
                self.repository.update_version(&version).await?;
                version
            }
            None => {
                let version = LayoutCheckVersion::first(config.id, diff_pixel_url);
                self.repository.create_version(version.clone()).await?;
                version
            }
        };

        info!(config_id = %config.id, version = %version.version, "updated layout check version");
        Ok(RecordOutcome {
            config_id: config.id,
            version: version.version,
            diff_pixel_url: version.diff_pixel_url,
            created: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CheckKey {
        CheckKey {
            website_url: "https://example.com".into(),
            figma_url: "https://www.figma.com/design/ABC123/Title?node-id=1-921".into(),
            figma_token: "figd_token".into(),
            project: "project-1".into(),
        }
    }

    fn store_with(repo: Arc<MemoryRepository>) -> CheckResultStore {
        CheckResultStore::new(repo, Arc::new(MemoryArtifactStore::new()))
    }

    #[tokio::test]
    async fn first_check_creates_config_and_version_one() {
        let repo = Arc::new(MemoryRepository::new());
        let store = store_with(repo.clone());

        let outcome = store.record(&key(), "url-1".into()).await.unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.version, "1");

        let state = repo.snapshot().await;
        assert_eq!(state.configs.len(), 1);
        assert_eq!(state.versions.len(), 1);
        assert_eq!(state.versions[0].config_id, state.configs[0].id);
        assert_eq!(state.versions[0].diff_pixel_url, "url-1");
    }

    #[tokio::test]
    async fn second_check_increments_the_single_version() {
        let repo = Arc::new(MemoryRepository::new());
        let store = store_with(repo.clone());

        let first = store.record(&key(), "url-1".into()).await.unwrap();
        let second = store.record(&key(), "url-2".into()).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.config_id, first.config_id);
        assert_eq!(second.version, "2");

        let state = repo.snapshot().await;
        assert_eq!(state.configs.len(), 1);
        assert_eq!(state.versions.len(), 1);
        assert_eq!(state.versions[0].version, "2");
        assert_eq!(state.versions[0].diff_pixel_url, "url-2");
    }

    #[tokio::test]
    async fn different_token_is_a_different_config() {
        let repo = Arc::new(MemoryRepository::new());
        let store = store_with(repo.clone());
        store.record(&key(), "a".into()).await.unwrap();
        let other = CheckKey {
            figma_token: "another".into(),
            ..key()
        };
        let outcome = store.record(&other, "b".into()).await.unwrap();
        assert!(outcome.created);
        assert_eq!(repo.snapshot().await.configs.len(), 2);
    }

    #[tokio::test]
    async fn config_without_version_gets_version_one() {
        let repo = Arc::new(MemoryRepository::new());
        let config = LayoutCheckConfig::new(&key());
        repo.state_for_tests().await.configs.push(config.clone());

        let outcome = store_with(repo.clone())
            .record(&key(), "url".into())
            .await
            .unwrap();
        assert!(!outcome.created);
        assert_eq!(outcome.config_id, config.id);
        assert_eq!(outcome.version, "1");
        assert_eq!(repo.snapshot().await.versions.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_records_do_not_lose_updates() {
        let repo = Arc::new(MemoryRepository::new());
        let store = Arc::new(store_with(repo.clone()));

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.record(&key(), format!("url-{i}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let state = repo.snapshot().await;
        assert_eq!(state.configs.len(), 1);
        assert_eq!(state.versions.len(), 1);
        assert_eq!(state.versions[0].version, "16");
    }

    #[tokio::test]
    async fn record_diff_uploads_before_recording() {
        let repo = Arc::new(MemoryRepository::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let store = CheckResultStore::new(repo.clone(), artifacts.clone());

        let outcome = store.record_diff(&key(), b"png").await.unwrap();
        assert_eq!(outcome.diff_pixel_url, "memory://diff/1");
        assert_eq!(artifacts.len().await, 1);
    }

    #[tokio::test]
    async fn failed_record_discards_uploaded_diff() {
        let repo = Arc::new(MemoryRepository::new());
        let config = LayoutCheckConfig::new(&key());
        let mut version = LayoutCheckVersion::first(config.id, "memory://diff/0");
        version.version = "v-two".into();
        {
            let mut state = repo.state_for_tests().await;
            state.configs.push(config);
            state.versions.push(version);
        }
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let store = CheckResultStore::new(repo.clone(), artifacts.clone());

        let err = store.record_diff(&key(), b"png").await.unwrap_err();
        assert!(matches!(err, crate::LayoutCheckError::Store(_)));
        assert!(artifacts.is_empty().await);
        assert_eq!(repo.snapshot().await.versions[0].version, "v-two");
    }

    #[tokio::test]
    async fn file_backed_store_increments_across_instances() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = StorageConfig {
            artifacts_dir: dir.path().join("artifacts"),
            state_file: dir.path().join("checks.json"),
        };

        let first = CheckResultStore::from_config(&storage)
            .record_diff(&key(), b"one")
            .await
            .unwrap();
        let second = CheckResultStore::from_config(&storage)
            .record_diff(&key(), b"two")
            .await
            .unwrap();

        assert_eq!(first.version, "1");
        assert_eq!(second.version, "2");
        assert_ne!(first.diff_pixel_url, second.diff_pixel_url);
        assert!(second.diff_pixel_url.starts_with("file://"));
    }
}
