//! Maintainer configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to load a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("can't parse YAML from config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

/// Auxiliary structure to parse [`MaintainerConfig`] from a file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct MaintainerConfigRaw {
    /// delay between maintenance ticks in seconds
    pub tick_interval: Option<f64>,
    /// solver iteration budget per top-level call
    pub max_iterations: Option<u32>,
    /// how many co-tenants of a host may be disturbed in a single displacement step
    pub max_eviction_subset_size: Option<usize>,
    /// cap on the tenant list length considered for subset enumeration
    pub max_considered_nodes: Option<usize>,
    /// whether the surrounding cloud permits placing tenants on shared hosts
    pub allow_host_sharing: Option<bool>,
}

/// Represents maintainer configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct MaintainerConfig {
    /// delay between maintenance ticks in seconds
    pub tick_interval: f64,
    /// solver iteration budget per top-level call
    pub max_iterations: u32,
    /// how many co-tenants of a host may be disturbed in a single displacement step
    pub max_eviction_subset_size: usize,
    /// cap on the tenant list length considered for subset enumeration
    pub max_considered_nodes: usize,
    /// whether the surrounding cloud permits placing tenants on shared hosts
    pub allow_host_sharing: bool,
}

impl MaintainerConfig {
    /// Creates maintainer config with default parameter values.
    pub fn new() -> Self {
        Self {
            tick_interval: 600.,
            max_iterations: 10_000,
            max_eviction_subset_size: 5,
            max_considered_nodes: 31,
            allow_host_sharing: true,
        }
    }

    /// Creates maintainer config by reading parameter values from a .yaml
    /// file, falling back to defaults for absent parameters.
    pub fn from_file(file_name: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(file_name).map_err(|source| ConfigError::Io {
            path: file_name.to_string(),
            source,
        })?;
        let raw: MaintainerConfigRaw =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: file_name.to_string(),
                source,
            })?;
        let default = MaintainerConfig::new();
        Ok(Self {
            tick_interval: raw.tick_interval.unwrap_or(default.tick_interval),
            max_iterations: raw.max_iterations.unwrap_or(default.max_iterations),
            max_eviction_subset_size: raw
                .max_eviction_subset_size
                .unwrap_or(default.max_eviction_subset_size),
            max_considered_nodes: raw.max_considered_nodes.unwrap_or(default.max_considered_nodes),
            allow_host_sharing: raw.allow_host_sharing.unwrap_or(default.allow_host_sharing),
        })
    }
}

impl Default for MaintainerConfig {
    fn default() -> Self {
        Self::new()
    }
}
