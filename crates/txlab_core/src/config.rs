use anyhow::{Context, Result, bail};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Upper bound on `history_limit`.
pub const MAX_HISTORY_LIMIT: usize = 50;

/// Toolbox configuration, persisted as JSON at `~/.txlab/config.json`.
///
/// Missing fields fall back to their defaults so older files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TxlabConfig {
    // Networking
    pub probe_timeout_ms: u64,
    pub call_timeout_ms: u64,

    // Session state
    pub history_limit: usize,
    pub latency_cache_ttl_secs: u64,

    // General
    pub default_family: String,
    pub log_level: String,
}

impl Default for TxlabConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 5_000,
            call_timeout_ms: 30_000,
            history_limit: 50,
            latency_cache_ttl_secs: 300,
            default_family: "evm".into(),
            log_level: "info".into(),
        }
    }
}

impl TxlabConfig {
    /// Returns the base config directory: `~/.txlab/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".txlab"))
    }

    /// Returns the config file path: `~/.txlab/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.txlab/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Returns the key-value store path: `~/.txlab/store.json`
    pub fn store_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("store.json"))
    }

    /// Ensures all required directories exist.
    pub fn ensure_dirs() -> Result<()> {
        let dirs = [Self::base_dir()?, Self::logs_dir()?];
        for dir in &dirs {
            if !dir.exists() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Loads config from disk, or creates default if missing.
    pub fn load() -> Result<Self> {
        Self::ensure_dirs()?;
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load config from a specific file path.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self =
                serde_json::from_str(&content).with_context(|| "Failed to parse config.json")?;
            config
                .validate()
                .with_context(|| format!("Invalid config: {}", path.display()))?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to_path(&path)
    }

    /// Save config to a specific file path.
    pub fn save_to_path(&self, path: &PathBuf) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Reject values the rest of the toolbox cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 || self.history_limit > MAX_HISTORY_LIMIT {
            bail!(
                "history_limit must be between 1 and {MAX_HISTORY_LIMIT}, got {}",
                self.history_limit
            );
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn latency_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.latency_cache_ttl_secs)
    }
}

// ---------------------------------------------------------------------------
// ConfigManager
// ---------------------------------------------------------------------------

/// Thread-safe config holder that writes through to disk on update.
pub struct ConfigManager {
    config: Arc<RwLock<TxlabConfig>>,
    path: PathBuf,
}

impl ConfigManager {
    /// Load from `~/.txlab/config.json`.
    pub fn new() -> Result<Self> {
        TxlabConfig::ensure_dirs()?;
        Self::with_path(TxlabConfig::config_path()?)
    }

    /// Load from an explicit path (for testing without `~/.txlab/`).
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let config = TxlabConfig::load_from_path(&path)?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            path,
        })
    }

    /// Get a clone of the current config.
    pub fn get(&self) -> TxlabConfig {
        self.config.read().clone()
    }

    /// Mutate the config and persist it.
    pub fn update(&self, f: impl FnOnce(&mut TxlabConfig)) -> Result<()> {
        let mut config = self.config.write();
        f(&mut config);
        config.save_to_path(&self.path)
    }

    /// Write the current config back to disk.
    pub fn save(&self) -> Result<()> {
        self.config.read().save_to_path(&self.path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
