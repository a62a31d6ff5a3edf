use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::ConfigError;

pub const ENV_SCOPE_POLICY: &str = "SCOPED_REGISTRY_SCOPE_POLICY";
pub const ENV_MAX_DEPTH: &str = "SCOPED_REGISTRY_MAX_DEPTH";

pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 64;

/// How a child scope sees its parent's singletons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopePolicy {
    /// Copy descriptors and already-realized singletons at scope creation.
    /// A singleton first realized in the scope afterwards is the scope's own.
    #[default]
    Snapshot,
    /// Copy nothing; identities not registered in the scope are resolved by
    /// the ancestor that owns them, so each singleton is built once.
    Delegate,
}

impl FromStr for ScopePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snapshot" => Ok(ScopePolicy::Snapshot),
            "delegate" => Ok(ScopePolicy::Delegate),
            _ => Err(ConfigError::InvalidValue {
                key: "scope_policy".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ScopePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopePolicy::Snapshot => write!(f, "snapshot"),
            ScopePolicy::Delegate => write!(f, "delegate"),
        }
    }
}

/// Registry behavior settings. Scopes inherit their parent's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub scope_policy: ScopePolicy,
    /// Maximum number of nested factory invocations on one thread.
    pub max_resolution_depth: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            scope_policy: ScopePolicy::default(),
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
        }
    }
}

/// Registry settings as read from a file; missing keys fall back to defaults.
/// The policy is kept as text so file and environment share one parser.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct PartialRegistryConfig {
    pub scope_policy: Option<String>,
    pub max_resolution_depth: Option<usize>,
}

impl RegistryConfig {
    /// Merge file values with environment overrides. Environment wins.
    pub fn from_partial_and_env(
        partial: Option<PartialRegistryConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();
        let defaults = RegistryConfig::default();

        let scope_policy = match env_map.get(ENV_SCOPE_POLICY).or(partial.scope_policy.as_ref()) {
            Some(value) => value.parse()?,
            None => defaults.scope_policy,
        };

        let max_resolution_depth = match env_map.get(ENV_MAX_DEPTH) {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_MAX_DEPTH.to_string(),
                value: value.clone(),
            })?,
            None => partial
                .max_resolution_depth
                .unwrap_or(defaults.max_resolution_depth),
        };

        let config = RegistryConfig {
            scope_policy,
            max_resolution_depth,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_resolution_depth".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_scope_policy(mut self, scope_policy: ScopePolicy) -> Self {
        self.scope_policy = scope_policy;
        self
    }

    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }
}
