use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{CheckKey, LayoutCheckConfig, LayoutCheckVersion};
use crate::{LayoutCheckError, Result};

/// Every stored config and version; the unit both repositories persist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub configs: Vec<LayoutCheckConfig>,
    #[serde(default)]
    pub versions: Vec<LayoutCheckVersion>,
}

impl StoreState {
    pub fn find_config(&self, key: &CheckKey) -> Option<&LayoutCheckConfig> {
        self.configs.iter().find(|config| config.matches(key))
    }

    pub fn find_version(&self, config_id: Uuid) -> Option<&LayoutCheckVersion> {
        self.versions.iter().find(|v| v.config_id == config_id)
    }

    pub(crate) fn insert_config_and_version(
        &mut self,
        config: LayoutCheckConfig,
        version: LayoutCheckVersion,
    ) -> Result<()> {
        if version.config_id != config.id {
            return Err(LayoutCheckError::store(format!(
                "version {} does not belong to config {}",
                version.id, config.id
            )));
        }
        if self.configs.iter().any(|c| c.id == config.id) {
            return Err(LayoutCheckError::store(format!(
                "config {} already exists",
                config.id
            )));
        }
        self.configs.push(config);
        self.versions.push(version);
        Ok(())
    }

    pub(crate) fn insert_version(&mut self, version: LayoutCheckVersion) -> Result<()> {
        if !self.configs.iter().any(|c| c.id == version.config_id) {
            return Err(LayoutCheckError::store(format!(
                "config {} does not exist",
                version.config_id
            )));
        }
        if self.find_version(version.config_id).is_some() {
            return Err(LayoutCheckError::store(format!(
                "config {} already has a version",
                version.config_id
            )));
        }
        self.versions.push(version);
        Ok(())
    }

    pub(crate) fn replace_version(&mut self, version: &LayoutCheckVersion) -> Result<()> {
        let slot = self
            .versions
            .iter_mut()
            .find(|v| v.id == version.id)
            .ok_or_else(|| LayoutCheckError::store(format!("version {} not found", version.id)))?;
        *slot = version.clone();
        Ok(())
    }
}
