// Global configuration management

use crate::engine::worker::BridgePool;
use crate::engine::{
    BridgeSettings, BucketRow, BucketTable, CapabilityTier, MediaBridge, WriteMode,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub replace: ReplaceConfig,

    #[serde(default)]
    pub buckets: BucketsConfig,

    #[serde(default)]
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Platform API level; 29+ uses scoped handles, 30+ allows batch consent
    #[serde(default = "default_tier")]
    pub tier: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Absolute path prefix the catalog reports paths under
    #[serde(default = "default_logical_root")]
    pub logical_root: String,

    /// Directory standing in for the storage volume (defaults to the current directory)
    #[serde(default)]
    pub volume_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplaceConfig {
    /// "truncate" rewrites in place; "atomic-swap" writes a fresh file and renames it over
    #[serde(default)]
    pub mode: WriteMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketsConfig {
    /// Extra (prefix, bucket) rows checked after the built-in ones
    #[serde(default)]
    pub extra: Vec<BucketRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersConfig {
    /// Concurrent bridge operations in a `BridgePool` (at least 1)
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,
}

fn default_tier() -> u32 {
    33
}

fn default_logical_root() -> String {
    "/storage/emulated/0".to_string()
}

fn default_max_workers() -> u32 {
    2
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            tier: default_tier(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            logical_root: default_logical_root(),
            volume_dir: None,
        }
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "macos") {
            dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config")
                .join("mediabridge")
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("mediabridge")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        let config = Config::default();

        // Not being able to write the default file is not fatal
        if let Err(e) = config.save_to(&config_path) {
            tracing::warn!("Could not create default config file: {:#}", e);
            tracing::warn!(
                "Using built-in defaults. Run 'mediabridge init-config' to create a config file."
            );
        }

        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn exists() -> bool {
        Self::config_path().map(|p| p.exists()).unwrap_or(false)
    }

    pub fn ensure_default() -> Result<()> {
        if !Self::exists() {
            Config::default().save()?;
        }
        Ok(())
    }

    pub fn tier(&self) -> CapabilityTier {
        CapabilityTier(self.platform.tier)
    }

    /// Volume directory, falling back to the current directory
    pub fn volume_dir(&self) -> Result<PathBuf> {
        match &self.storage.volume_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Could not determine current directory"),
        }
    }

    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            tier: self.tier(),
            storage_root: self.storage.logical_root.clone(),
            buckets: BucketTable::with_extra(&self.buckets.extra),
            write_mode: self.replace.mode,
        }
    }

    /// Worker pool sized by `[workers] max_workers`
    pub fn bridge_pool(&self, bridge: Arc<MediaBridge>) -> BridgePool {
        BridgePool::new(bridge, self.workers.max_workers.max(1) as usize)
    }
}
