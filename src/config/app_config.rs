use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::Level;

use crate::errors::ConfigError;
use crate::logging::{LogFormat, LoggingConfig};

use super::registry_config::{PartialRegistryConfig, RegistryConfig};

pub const ENV_LOG_LEVEL: &str = "SCOPED_REGISTRY_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "SCOPED_REGISTRY_LOG_FORMAT";

/// Complete configuration: registry behavior plus logging.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

/// Configuration as read from a TOML file.
///
/// ```toml
/// [registry]
/// scope_policy = "delegate"
/// max_resolution_depth = 32
///
/// [logging]
/// level = "debug"
/// format = "compact"
/// ```
#[derive(Deserialize, Debug, Default)]
pub struct PartialAppConfig {
    registry: Option<PartialRegistryConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PartialLoggingConfig {
    level: Option<String>,
    format: Option<LogFormat>,
    show_target: Option<bool>,
    show_thread_ids: Option<bool>,
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let partial: PartialAppConfig = toml::from_str(content)?;
        Self::from_partial_and_env(Some(partial), HashMap::new())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    /// Create AppConfig from partial config and environment
    pub fn from_partial_and_env(
        partial: Option<PartialAppConfig>,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let registry = RegistryConfig::from_partial_and_env(partial.registry, &env_map)?;
        let logging = logging_from_partial(partial.logging, &env_map)?;

        Ok(AppConfig { registry, logging })
    }
}

fn logging_from_partial(
    partial: Option<PartialLoggingConfig>,
    env_map: &HashMap<String, String>,
) -> Result<LoggingConfig, ConfigError> {
    let partial = partial.unwrap_or_default();
    let mut config = LoggingConfig::default();

    if let Some(level) = env_map.get(ENV_LOG_LEVEL).or(partial.level.as_ref()) {
        config.level = level
            .trim()
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: level.clone(),
            })?;
    }

    if let Some(format) = env_map.get(ENV_LOG_FORMAT) {
        config.format = format.parse()?;
    } else if let Some(format) = partial.format {
        config.format = format;
    }

    if let Some(show_target) = partial.show_target {
        config.show_target = show_target;
    }
    if let Some(show_thread_ids) = partial.show_thread_ids {
        config.show_thread_ids = show_thread_ids;
    }

    Ok(config)
}
