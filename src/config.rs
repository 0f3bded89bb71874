//! Configuration management for devicegate
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::devices::{DeviceFilter, DeviceProfile};
use crate::error::{AppError, AppResult};
use crate::selection::FilterCriteria;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Log levels accepted in `[observability]`
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub suite: SuiteConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub device_filter: DeviceFilterConfig,
    /// Desired capabilities every session starts from
    #[serde(default)]
    pub capabilities: BTreeMap<String, String>,
    /// Device list the run may target
    #[serde(default, rename = "device")]
    pub devices: Vec<DeviceProfile>,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Location of the suite manifest
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
        }
    }
}

fn default_manifest() -> String {
    "suite.toml".to_string()
}

/// Phase and tag filters, as comma-separated lists
///
/// Absent or empty values leave the dimension unfiltered.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    #[serde(default)]
    pub test_phase: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

impl SelectionConfig {
    /// Parse the configured lists into filter criteria
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria::new(self.test_phase.as_deref(), self.tags.as_deref())
    }
}

/// Device list filter
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceFilterConfig {
    /// One device name or a comma-separated list
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform_name: Option<String>,
    #[serde(default)]
    pub platform_version: Option<String>,
}

impl DeviceFilterConfig {
    pub fn filter(&self) -> DeviceFilter {
        DeviceFilter::new(
            self.name.as_deref(),
            self.platform_name.as_deref(),
            self.platform_version.as_deref(),
        )
    }
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self = toml::from_str(&content).map_err(|source| {
            AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Location of the suite manifest
    ///
    /// A relative `suite.manifest` is resolved against the directory of the
    /// configuration file it was read from.
    pub fn manifest_path<P: AsRef<Path>>(&self, config_path: P) -> PathBuf {
        let manifest = Path::new(&self.suite.manifest);
        if manifest.is_absolute() {
            return manifest.to_path_buf();
        }
        match config_path.as_ref().parent() {
            Some(dir) => dir.join(manifest),
            None => manifest.to_path_buf(),
        }
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()` and `from_str()`.
    /// Device types and platform names are not checked here; the selection
    /// engine reports values it does not recognise per test.
    pub fn validate(&self) -> AppResult<()> {
        let mut names = HashSet::new();
        for device in &self.devices {
            if device.name().trim().is_empty() {
                return Err(AppError::Config(
                    "every [[device]] entry needs a non-empty name".to_string(),
                ));
            }
            if !names.insert(device.name()) {
                return Err(AppError::Config(format!(
                    "device '{}' is listed more than once",
                    device.name()
                )));
            }
        }

        if let Some(key) = self.capabilities.keys().find(|k| k.trim().is_empty()) {
            return Err(AppError::Config(format!(
                "capability keys must not be empty, got '{}'",
                key
            )));
        }

        if self.suite.manifest.trim().is_empty() {
            return Err(AppError::Config(
                "suite.manifest must not be empty".to_string(),
            ));
        }

        let level = self.observability.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(AppError::Config(format!(
                "observability.log_level '{}' is not one of: {}",
                self.observability.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(toml_str).map_err(|source| {
            AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            }
        })?;

        config.validate()?;
        Ok(config)
    }
}
