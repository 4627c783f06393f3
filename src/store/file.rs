use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::models::{CheckKey, LayoutCheckConfig, LayoutCheckVersion};
use super::state::StoreState;
use super::CheckRepository;
use crate::{LayoutCheckError, Result};

/// Repository persisted as a single JSON document.
///
/// Every call reads the file and every mutation rewrites it through a
/// temporary file and a rename, so a crash never leaves half a document.
#[derive(Debug)]
pub struct FileRepository {
    path: PathBuf,
    io: Mutex<()>,
}

impl FileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<StoreState> {
        let _guard = self.io.lock().await;
        self.read_state().await
    }

    async fn read_state(&self) -> Result<StoreState> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(StoreState::default()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                LayoutCheckError::store(format!(
                    "state file {} is corrupt: {e}",
                    self.path.display()
                ))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(StoreState::default()),
            Err(err) => Err(LayoutCheckError::store(format!(
                "failed to read {}: {err}",
                self.path.display()
            ))),
        }
    }

    async fn write_state(&self, state: &StoreState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                LayoutCheckError::store(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            LayoutCheckError::store(format!("failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            LayoutCheckError::store(format!("failed to replace {}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), configs = state.configs.len(), "state file written");
        Ok(())
    }

    async fn mutate<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut StoreState) -> Result<()> + Send,
    {
        let _guard = self.io.lock().await;
        let mut state = self.read_state().await?;
        f(&mut state)?;
        self.write_state(&state).await
    }
}

#[async_trait]
impl CheckRepository for FileRepository {
    async fn find_config(&self, key: &CheckKey) -> Result<Option<LayoutCheckConfig>> {
        Ok(self.load().await?.find_config(key).cloned())
    }

    async fn find_version(&self, config_id: Uuid) -> Result<Option<LayoutCheckVersion>> {
        Ok(self.load().await?.find_version(config_id).cloned())
    }

    async fn create_config_and_version(
        &self,
        config: LayoutCheckConfig,
        version: LayoutCheckVersion,
    ) -> Result<()> {
        self.mutate(move |state| state.insert_config_and_version(config, version))
            .await
    }

    async fn create_version(&self, version: LayoutCheckVersion) -> Result<()> {
        self.mutate(move |state| state.insert_version(version)).await
    }

    async fn update_version(&self, version: &LayoutCheckVersion) -> Result<()> {
        self.mutate(|state| state.replace_version(version)).await
    }
}
