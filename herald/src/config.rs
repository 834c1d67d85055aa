//! Configuration file discovery and loading

use std::path::{Path, PathBuf};

use anyhow::Context;
use herald_dispatch::DispatchConfig;
use herald_metrics::MetricsConfig;
use herald_whatsapp::WhatsAppConfig;
use serde::Deserialize;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "HERALD_CONFIG";

/// Locations searched, in order, when [`CONFIG_ENV`] is not set.
pub const DEFAULT_PATHS: [&str; 2] = ["./herald.config.ron", "/etc/herald/herald.config.ron"];

/// Contents of `herald.config.ron`. Every section is optional.
#[derive(Debug, Default, Deserialize)]
pub struct HeraldConfig {
    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl HeraldConfig {
    /// Parse a RON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid RON for this structure.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Load from an explicit path, or from the first file discovery finds,
    /// or fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if [`CONFIG_ENV`] names a missing file, or the chosen
    /// file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(std::env::var(CONFIG_ENV).ok(), &DEFAULT_PATHS)?,
        };

        match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading configuration");
                Self::from_file(&path)
            }
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Find the configuration file using the following precedence:
/// 1. `HERALD_CONFIG` environment variable (`env_path`)
/// 2. ./herald.config.ron (current working directory)
/// 3. /etc/herald/herald.config.ron (system-wide config)
///
/// # Errors
///
/// Returns an error if `env_path` is set but does not exist.
pub fn find_config_file(
    env_path: Option<String>,
    candidates: &[&str],
) -> anyhow::Result<Option<PathBuf>> {
    if let Some(env_path) = env_path {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        anyhow::bail!("{CONFIG_ENV} points to non-existent file: {}", path.display());
    }

    Ok(candidates
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists()))
}
