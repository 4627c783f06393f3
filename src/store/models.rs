use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LayoutCheckError, Result};

pub const INITIAL_VERSION: &str = "1";

/// Identity of a stored check: exact string equality on all four fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckKey {
    pub website_url: String,
    pub figma_url: String,
    pub figma_token: String,
    pub project: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutCheckConfig {
    pub id: Uuid,
    pub figma_url: String,
    pub figma_token: String,
    pub website_url: String,
    pub project: String,
    pub created_at: DateTime<Utc>,
}

impl LayoutCheckConfig {
    pub fn new(key: &CheckKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            figma_url: key.figma_url.clone(),
            figma_token: key.figma_token.clone(),
            website_url: key.website_url.clone(),
            project: key.project.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn matches(&self, key: &CheckKey) -> bool {
        self.website_url == key.website_url
            && self.figma_url == key.figma_url
            && self.figma_token == key.figma_token
            && self.project == key.project
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutCheckVersion {
    pub id: Uuid,
    pub config_id: Uuid,
    pub version: String,
    pub diff_pixel_url: String,
    pub updated_at: DateTime<Utc>,
}

impl LayoutCheckVersion {
    pub fn first(config_id: Uuid, diff_pixel_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            config_id,
            version: INITIAL_VERSION.to_string(),
            diff_pixel_url: diff_pixel_url.into(),
            updated_at: Utc::now(),
        }
    }

    /// Point at a new diff image and bump the version number.
    pub fn advance(&mut self, diff_pixel_url: impl Into<String>) -> Result<()> {
        let current: u64 = self.version.trim().parse().map_err(|_| {
            LayoutCheckError::store(format!(
                "stored version {:?} for config {} is not numeric",
                self.version, self.config_id
            ))
        })?;
        let next = current.checked_add(1).ok_or_else(|| {
            LayoutCheckError::store(format!(
                "stored version {} for config {} cannot be incremented",
                self.version, self.config_id
            ))
        })?;
        self.version = next.to_string();
        self.diff_pixel_url = diff_pixel_url.into();
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// What a `record` call left in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub config_id: Uuid,
    pub version: String,
    pub diff_pixel_url: String,
    /// True when this call created the config.
    pub created: bool,
}
