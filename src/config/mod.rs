//! Configuration system - YAML-based config loading.
//!
//! Loads config.yml from the netmapper home directory, falling back to
//! built-in defaults, then applies environment variable overrides.

pub mod settings;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub use settings::*;

/// Load configuration from the YAML file, defaults, and environment.
pub fn load_config(config_dir: Option<&Path>) -> Result<NetmapConfig> {
    let home = config_dir
        .map(PathBuf::from)
        .or_else(|| std::env::var("NETMAPPER_HOME").ok().map(PathBuf::from))
        .or_else(dirs::home_dir)
        .context("Cannot determine home directory")?;

    let config_path = home.join(crate::DEFAULT_CONFIG_FILE);
    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config = serde_yaml::from_str::<NetmapConfig>(&contents)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        info!("Loaded configuration from {}", config_path.display());
        config
    } else {
        NetmapConfig::default()
    };

    config.apply_env_overrides();

    Ok(config)
}
