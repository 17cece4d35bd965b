//! Configuration for the LMDB-backed provider

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AclError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the LMDB environment, created if missing
    pub path: PathBuf,
    #[serde(default = "default_map_size")]
    pub map_size: usize,
    #[serde(default = "default_max_dbs")]
    pub max_dbs: u32,
    /// Keep collections read through `find_acl`/`find_acls` in memory
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
    /// Most collections the cache holds before evicting
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_map_size() -> usize {
    1 << 30
}

fn default_max_dbs() -> u32 {
    2
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_capacity() -> usize {
    10_000
}

impl Config {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            map_size: default_map_size(),
            max_dbs: default_max_dbs(),
            cache_enabled: default_cache_enabled(),
            cache_capacity: default_cache_capacity(),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(AclError::Config("path cannot be empty".into()));
        }
        if self.map_size == 0 {
            return Err(AclError::Config("map_size must be positive".into()));
        }
        if self.max_dbs == 0 {
            return Err(AclError::Config("max_dbs must be at least 1".into()));
        }
        if self.cache_enabled && self.cache_capacity == 0 {
            return Err(AclError::Config("cache_capacity must be positive when the cache is enabled".into()));
        }
        Ok(())
    }
}
