use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Runtime configuration, loadable from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-pixel YIQ distance threshold (0.0 - 1.0); smaller is more sensitive.
    pub threshold: f64,
    pub timeouts: Timeouts,
    pub browser: BrowserConfig,
    pub figma: FigmaConfig,
    pub semantic: SemanticConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    #[serde(with = "humantime_serde")]
    pub figma: Duration,
    #[serde(with = "humantime_serde")]
    pub navigation: Duration,
    #[serde(with = "humantime_serde")]
    pub network_idle: Duration,
    #[serde(with = "humantime_serde")]
    pub process: Duration,
    #[serde(with = "humantime_serde")]
    pub advisor: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            figma: Duration::from_secs(30),
            navigation: Duration::from_secs(30),
            network_idle: Duration::from_secs(10),
            process: Duration::from_secs(45),
            advisor: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub node_command: String,
    pub headless: bool,
    pub max_concurrent_sessions: usize,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            headless: true,
            max_concurrent_sessions: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FigmaConfig {
    pub base_url: String,
    pub scale: f32,
}

impl Default for FigmaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.figma.com".to_string(),
            scale: 1.0,
        }
    }
}

/// Settings for the AI-assisted semantic diff step.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    pub enabled: bool,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    /// Path to a prompt template; the built-in template is used when unset.
    pub prompt_template: Option<PathBuf>,
    pub max_tokens: u32,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_endpoint: None,
            api_key: None,
            model: None,
            prompt_template: None,
            max_tokens: 400,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory receiving diff image artifacts.
    pub artifacts_dir: PathBuf,
    /// JSON file holding check configs and versions.
    pub state_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs_base().join("layout-checker");
        Self {
            artifacts_dir: base.join("artifacts"),
            state_file: base.join("checks.json"),
        }
    }
}

fn dirs_base() -> PathBuf {
    std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
        .unwrap_or_else(std::env::temp_dir)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            timeouts: Timeouts::default(),
            browser: BrowserConfig::default(),
            figma: FigmaConfig::default(),
            semantic: SemanticConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

impl Config {
    /// `~/.config/layout-checker/config.toml`, if a home directory is known.
    pub fn central_config_path() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
            .map(|base| base.join("layout-checker").join("config.toml"))
    }

    /// Load from an explicit path, else the central config file, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::central_config_path() {
                Some(central) if central.is_file() => Self::from_file(&central),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::Invalid(format!(
                "threshold must be within 0.0..=1.0 (got {})",
                self.threshold
            )));
        }
        let t = &self.timeouts;
        for (name, value) in [
            ("figma", t.figma),
            ("navigation", t.navigation),
            ("network_idle", t.network_idle),
            ("process", t.process),
            ("advisor", t.advisor),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "timeouts.{name} must be greater than zero"
                )));
            }
        }
        if self.browser.max_concurrent_sessions == 0 {
            return Err(ConfigError::Invalid(
                "browser.max_concurrent_sessions must be at least 1".into(),
            ));
        }
        if self.figma.scale <= 0.0 {
            return Err(ConfigError::Invalid(
                "figma.scale must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
