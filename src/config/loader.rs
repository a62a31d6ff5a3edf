use std::{collections::HashMap, env, fs, path::PathBuf};

use crate::errors::ConfigError;

use super::app_config::{AppConfig, PartialAppConfig};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "SCOPED_REGISTRY_";

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Environment only
    pub fn new() -> Self {
        Self { path: None }
    }

    /// File plus environment. A missing file is not an error.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Load complete configuration
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let partial = self.load_partial_config()?;
        let env_map = self.collect_env_vars();
        AppConfig::from_partial_and_env(partial, env_map)
    }

    fn load_partial_config(&self) -> Result<Option<PartialAppConfig>, ConfigError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.display().to_string(), e))?;
        let partial = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(Some(partial))
    }

    fn collect_env_vars(&self) -> HashMap<String, String> {
        env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
