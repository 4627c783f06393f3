use std::path::Path;

use layout_checker::{Config, LayoutCheckError};

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/layout-checker/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, LayoutCheckError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        LayoutCheckError::Config(format!("Failed to read config {loc}: {e}"))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {e}", p.display()))
            .unwrap_or_else(|| format!("Invalid config: {e}"));
        LayoutCheckError::Config(prefix)
    })?;
    Ok(cfg)
}

/// CLI threshold wins over the config value; either must lie in 0.0..=1.0.
pub fn resolve_threshold(cli: Option<f64>, config: &Config) -> Result<f64, LayoutCheckError> {
    let threshold = cli.unwrap_or(config.threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(LayoutCheckError::Config(format!(
            "threshold must be between 0.0 and 1.0 (got {threshold})"
        )));
    }
    Ok(threshold)
}

/// Single-line summary of the settings a check runs with.
pub fn format_effective_config(config: &Config, threshold: f64, source: Option<&Path>) -> String {
    let source = source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let t = &config.timeouts;
    format!(
        "Effective config [{source}]: threshold={threshold:.2}, timeouts: figma={}s, nav={}s, network-idle={}s, process={}s, advisor={}s, browser sessions={}, figma scale={}, ai={}, state={}",
        t.figma.as_secs(),
        t.navigation.as_secs(),
        t.network_idle.as_secs(),
        t.process.as_secs(),
        t.advisor.as_secs(),
        config.browser.max_concurrent_sessions,
        config.figma.scale,
        if config.semantic.enabled { "on" } else { "off" },
        config.storage.state_file.display(),
    )
}
