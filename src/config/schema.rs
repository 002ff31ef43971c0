use crate::controller::TabTiming;
use crate::error::ConfigError;
use crate::messaging::DeliveryPolicy;
use crate::store::{CoalescerConfig, MAX_BATCH_SIZE, THROTTLE_MS};
use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding config.toml and the store - computed, not serialized
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Path to config.toml - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ── Storage / write coalescing ───────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Minimum milliseconds between physical store writes (default: 2000)
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// Queued writes merged into one store call (default: 5)
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Store file name, relative to the data directory
    #[serde(default = "default_store_file")]
    pub store_file: String,
    /// Reject store writes closer together than this; 0 disables (default: 0)
    #[serde(default)]
    pub write_rate_limit_ms: u64,
}

fn default_throttle_ms() -> u64 {
    THROTTLE_MS
}

fn default_max_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_store_file() -> String {
    "store.json".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            max_batch_size: default_max_batch_size(),
            store_file: default_store_file(),
            write_rate_limit_ms: 0,
        }
    }
}

impl StorageConfig {
    pub fn coalescer_config(&self) -> CoalescerConfig {
        CoalescerConfig {
            throttle: Duration::from_millis(self.throttle_ms),
            max_batch_size: self.max_batch_size,
        }
    }
}

// ── Page delivery ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Per-send deadline in milliseconds (default: 5000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Attempts per delivery, including the first (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff unit between attempts (default: 100)
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Pause after a tab starts loading before settings are pushed (default: 50)
    #[serde(default = "default_ready_delay_ms")]
    pub ready_delay_ms: u64,
    /// Poll interval while waiting for a new tab's URL (default: 100)
    #[serde(default = "default_tab_ready_poll_ms")]
    pub tab_ready_poll_ms: u64,
    /// Give up waiting for a new tab's URL after this long (default: 10000)
    #[serde(default = "default_tab_ready_timeout_ms")]
    pub tab_ready_timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    100
}

fn default_ready_delay_ms() -> u64 {
    50
}

fn default_tab_ready_poll_ms() -> u64 {
    100
}

fn default_tab_ready_timeout_ms() -> u64 {
    10_000
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            ready_delay_ms: default_ready_delay_ms(),
            tab_ready_poll_ms: default_tab_ready_poll_ms(),
            tab_ready_timeout_ms: default_tab_ready_timeout_ms(),
        }
    }
}

impl DeliveryConfig {
    pub fn policy(&self) -> DeliveryPolicy {
        DeliveryPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
            base_backoff: Duration::from_millis(self.base_backoff_ms),
        }
    }

    pub fn tab_timing(&self) -> TabTiming {
        TabTiming {
            ready_delay: Duration::from_millis(self.ready_delay_ms),
            poll_interval: Duration::from_millis(self.tab_ready_poll_ms),
            ready_timeout: Duration::from_millis(self.tab_ready_timeout_ms),
        }
    }
}

// ── Observability ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let data_dir = home.join(".tintward");

        Self {
            config_path: data_dir.join("config.toml"),
            data_dir,
            storage: StorageConfig::default(),
            delivery: DeliveryConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.storage.max_batch_size == 0 {
            return Err(ConfigError::Validation(
                "storage.max_batch_size must be >= 1".into(),
            ));
        }
        if self.delivery.max_retries == 0 {
            return Err(ConfigError::Validation(
                "delivery.max_retries must be >= 1".into(),
            ));
        }
        if self.delivery.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "delivery.timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.store_file)
    }

    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Self::load_or_init_in(&home.join(".tintward"))
    }

    /// Load `<data_dir>/config.toml`, writing the defaults there first if absent.
    pub fn load_or_init_in(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join("config.toml");

        if !data_dir.exists() {
            fs::create_dir_all(data_dir)
                .map_err(ConfigError::Io)
                .context("Failed to create .tintward directory")?;
        }

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .map_err(ConfigError::Io)
                .context("Failed to read config file")?;
            let mut config: Config = toml::from_str(&contents).map_err(|e| {
                ConfigError::Load(format!("{}: {e}", config_path.display()))
            })?;
            // Set computed paths that are skipped during serialization
            config.config_path.clone_from(&config_path);
            config.data_dir = data_dir.to_path_buf();
            config.validate()?;
            Ok(config)
        } else {
            let config = Config {
                config_path,
                data_dir: data_dir.to_path_buf(),
                ..Config::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
