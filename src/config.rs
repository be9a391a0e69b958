//! Configuration file support for annorm.
//!
//! The engine reads a small JSON file holding the log level and the defaults
//! of every conversion run. Missing sections fall back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::format::ConversionTask;

/// Log level setting for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Conversion defaults
    #[serde(default)]
    pub conversion: ConversionConfig,
}

/// Conversion section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Task used when a run does not name one
    #[serde(default)]
    pub task: ConversionTask,

    /// Seed for class colors; colors are random per run without it
    #[serde(default)]
    pub color_seed: Option<u64>,

    /// Validate every written document
    #[serde(default = "default_true")]
    pub validate_output: bool,

    /// IoU at which same-class boxes count as duplicates, `None` to keep all
    #[serde(default = "default_duplicate_iou")]
    pub duplicate_iou: Option<f64>,

    /// Pretty-print written JSON
    #[serde(default = "default_true")]
    pub pretty: bool,
}

fn default_true() -> bool {
    true
}

fn default_duplicate_iou() -> Option<f64> {
    Some(0.95)
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            task: ConversionTask::default(),
            color_seed: None,
            validate_output: default_true(),
            duplicate_iou: default_duplicate_iou(),
            pretty: default_true(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            conversion: ConversionConfig::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        if let Some(iou) = config.conversion.duplicate_iou.filter(|v| !(*v > 0.0 && *v <= 1.0)) {
            return Err(ConfigError::Invalid(format!(
                "duplicate_iou must be in (0, 1], got {}",
                iou
            )));
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "annorm.json"
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// A setting is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
