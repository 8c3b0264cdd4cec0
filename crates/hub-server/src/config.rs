//! Server configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `music-hub.{toml,yaml,json}` file in the working directory, then `MUSIC_HUB_*`
//! environment variables.

use crate::services::directory::{DirectoryConfig, DEFAULT_DIRECTORY_BASE};
use crate::storage::{MemoryMode, StoreConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

pub const ENV_PREFIX: &str = "MUSIC_HUB";
pub const CONFIG_FILE: &str = "music-hub";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_address: String,
    pub database_url: String,
    pub store_connect_timeout_secs: u64,
    pub memory_mode: MemoryMode,
    pub directory_base_url: String,
    pub upstream_timeout_secs: u64,
    pub upstream_max_body_bytes: usize,
    pub log_level: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::builder()?
            .add_source(::config::File::with_name(CONFIG_FILE).required(false))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    fn builder() -> Result<::config::ConfigBuilder<::config::builder::DefaultState>> {
        Ok(::config::Config::builder()
            .set_default("bind_address", "0.0.0.0:8001")?
            .set_default("database_url", "sqlite://data/music_hub.db")?
            .set_default("store_connect_timeout_secs", 5)?
            .set_default("memory_mode", "filtered")?
            .set_default("directory_base_url", DEFAULT_DIRECTORY_BASE)?
            .set_default("upstream_timeout_secs", 15)?
            .set_default("upstream_max_body_bytes", 4 * 1024 * 1024)?
            .set_default("log_level", "info")?)
    }

    pub fn store(&self) -> StoreConfig {
        StoreConfig {
            database_url: self.database_url.clone(),
            connect_timeout: Duration::from_secs(self.store_connect_timeout_secs),
            memory_mode: self.memory_mode,
        }
    }

    pub fn directory(&self) -> DirectoryConfig {
        DirectoryConfig {
            base_url: self.directory_base_url.clone(),
            timeout: Duration::from_secs(self.upstream_timeout_secs),
            max_body_bytes: self.upstream_max_body_bytes,
        }
    }
}
