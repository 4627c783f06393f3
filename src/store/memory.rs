use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{CheckKey, LayoutCheckConfig, LayoutCheckVersion};
use super::state::StoreState;
use super::CheckRepository;
use crate::Result;

/// Repository kept in process memory; backs `CheckResultStore::in_memory`.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<StoreState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> StoreState {
        self.state.lock().await.clone()
    }

    #[cfg(test)]
    pub(crate) async fn state_for_tests(&self) -> tokio::sync::MutexGuard<'_, StoreState> {
        self.state.lock().await
    }
}

#[async_trait]
impl CheckRepository for MemoryRepository {
    async fn find_config(&self, key: &CheckKey) -> Result<Option<LayoutCheckConfig>> {
        Ok(self.state.lock().await.find_config(key).cloned())
    }

    async fn find_version(&self, config_id: Uuid) -> Result<Option<LayoutCheckVersion>> {
        Ok(self.state.lock().await.find_version(config_id).cloned())
    }

    async fn create_config_and_version(
        &self,
        config: LayoutCheckConfig,
        version: LayoutCheckVersion,
    ) -> Result<()> {
        self.state.lock().await.insert_config_and_version(config, version)
    }

    async fn create_version(&self, version: LayoutCheckVersion) -> Result<()> {
        self.state.lock().await.insert_version(version)
    }

    async fn update_version(&self, version: &LayoutCheckVersion) -> Result<()> {
        self.state.lock().await.replace_version(version)
    }
}
