//! Configuration settings for kitchen-queue.
//!
//! Settings are loaded from `~/.kitchen-queue/config.yaml`. Every field has a
//! default, so a partial (or missing) file is valid.

use serde::{Deserialize, Serialize};

use crate::cli::args::OutputFormat;
use crate::config::Paths;
use crate::error::KitchenError;

/// Environment variable overriding `remote.base_url`.
pub const URL_ENV: &str = "KITCHEN_QUEUE_URL";
/// Environment variable overriding `remote.api_key`.
pub const API_KEY_ENV: &str = "KITCHEN_QUEUE_API_KEY";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Remote row store settings.
    pub remote: RemoteConfig,
    /// Queue policy.
    pub queue: QueueConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output format.
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    /// Color output setting.
    #[serde(default = "default_color")]
    pub color: ColorSetting,
}

/// Color output setting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorSetting {
    /// Auto-detect based on terminal.
    #[default]
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

impl ColorSetting {
    /// Apply this setting to the global `colored` override.
    pub fn apply(self) {
        match self {
            Self::Auto => colored::control::unset_override(),
            Self::Always => colored::control::set_override(true),
            Self::Never => colored::control::set_override(false),
        }
    }
}

/// Remote row store (PostgREST) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: Option<String>,
    /// Anon or service key sent as `apikey` and bearer token.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Column used to address rows for update and delete.
    #[serde(default = "default_id_field")]
    pub id_field: String,
}

/// Queue policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Storage key of the durable mirror.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Start a replay pass right after enqueueing while online.
    #[serde(default = "default_true")]
    pub sync_on_enqueue: bool,
    /// Evict an operation to the dead-letter list after this many failed
    /// attempts. Unset means retry forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Seconds between connectivity probes in `watch`.
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
}

// Default value functions for serde
const fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

const fn default_color() -> ColorSetting {
    ColorSetting::Auto
}

const fn default_timeout_secs() -> u64 {
    10
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_storage_key() -> String {
    crate::storage::QUEUE_KEY.to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_probe_interval() -> u64 {
    15
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: default_output_format(),
            color: default_color(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            id_field: default_id_field(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            sync_on_enqueue: default_true(),
            max_attempts: None,
            probe_interval_secs: default_probe_interval(),
        }
    }
}

impl Config {
    /// Load configuration from the resolved data root.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load(paths: &Paths) -> Result<Self, KitchenError> {
        let mut config = Self::load_from_path(&paths.config_file)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, KitchenError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            KitchenError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            KitchenError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), KitchenError> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| KitchenError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, contents).map_err(|e| {
            KitchenError::Config(format!(
                "Failed to write config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Override remote settings from the environment.
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(URL_ENV) {
            if !url.is_empty() {
                self.remote.base_url = Some(url);
            }
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.remote.api_key = Some(key);
            }
        }
    }
}
