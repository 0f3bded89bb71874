//! Command-line interface for devicegate
//!
//! Provides argument parsing and subcommand handling for the devicegate binary.

use crate::config::Config;
use clap::{Parser, Subcommand, ValueEnum};

/// Declarative test selection and device-matrix planning
#[derive(Parser)]
#[command(name = "devicegate")]
#[command(version)]
#[command(about = "Declarative test selection and device-matrix planning")]
#[command(
    long_about = "devicegate decides which test methods run on which devices. Tests declare \
    phases, tags, device types and platforms in a suite manifest; the run is narrowed by \
    phase and tag criteria and by a filtered device list."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    /// Suite manifest path (overrides suite.manifest)
    #[arg(short, long, global = true)]
    pub suite: Option<String>,

    /// Comma-separated test phases to run (overrides selection.test_phase)
    #[arg(long, env = "TEST_PHASE", global = true)]
    pub test_phase: Option<String>,

    /// Comma-separated tags to run (overrides selection.tags)
    #[arg(long, env = "TAGS", global = true)]
    pub tags: Option<String>,

    /// Device name or comma-separated device names to target
    #[arg(long, global = true)]
    pub device_name: Option<String>,

    /// Platform name of the devices to target
    #[arg(long, global = true)]
    pub platform_name: Option<String>,

    /// Platform version of the devices to target
    #[arg(long, global = true)]
    pub platform_version: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the tests that would run on each target device (default)
    Plan {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Also print selection metrics in Prometheus text format
        #[arg(long)]
        metrics: bool,
    },

    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    ///
    /// Only flags that were given (or set through the environment) replace
    /// the configured value.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(suite) = &self.suite {
            config.suite.manifest = suite.clone();
        }
        if let Some(phase) = &self.test_phase {
            config.selection.test_phase = Some(phase.clone());
        }
        if let Some(tags) = &self.tags {
            config.selection.tags = Some(tags.clone());
        }
        if let Some(name) = &self.device_name {
            config.device_filter.name = Some(name.clone());
        }
        if let Some(platform) = &self.platform_name {
            config.device_filter.platform_name = Some(platform.clone());
        }
        if let Some(version) = &self.platform_version {
            config.device_filter.platform_version = Some(version.clone());
        }
    }
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# devicegate Configuration
# =========================
#
# This file configures the suite manifest, the selection criteria, the device
# list a run targets and the desired capabilities every session starts from.

# ─────────────────────────────────────────────────────────────────────────────
# SUITE
# ─────────────────────────────────────────────────────────────────────────────

[suite]
# Manifest declaring test classes, methods and their phase/tag/device metadata
manifest = "suite.toml"

# ─────────────────────────────────────────────────────────────────────────────
# SELECTION
# ─────────────────────────────────────────────────────────────────────────────
#
# Comma-separated, case-insensitive lists. Leave a value out to run every
# phase or every tag. Overridden by --test-phase / TEST_PHASE and
# --tags / TAGS.

[selection]
# Phases: "smoke", "sanity", "regression"
# test_phase = "regression"
# tags = "github, login"

# ─────────────────────────────────────────────────────────────────────────────
# DEVICE FILTER
# ─────────────────────────────────────────────────────────────────────────────
#
# Device names win over platform filters. Without any filter every device
# below is targeted.

[device_filter]
# name = "Pixel 7, iPad Air"
# platform_name = "Android"
# platform_version = "14"

# ─────────────────────────────────────────────────────────────────────────────
# DESIRED CAPABILITIES
# ─────────────────────────────────────────────────────────────────────────────
#
# Defaults merged into every session; device columns and per-device
# capabilities override them.

[capabilities]
appiumVersion = "2.0"
automationName = "UiAutomator2"

# ─────────────────────────────────────────────────────────────────────────────
# DEVICES
# ─────────────────────────────────────────────────────────────────────────────
#
# device_type: "phone" or "tablet"
# platform_name: "Android" or "iOS"

[[device]]
name = "Pixel 7"
device_type = "phone"
platform_name = "Android"
platform_version = "14"

[[device]]
name = "iPad Air"
device_type = "tablet"
platform_name = "iOS"
platform_version = "17"

[device.capabilities]
automationName = "XCUITest"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"
"#
}
