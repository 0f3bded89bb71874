//! Device list filtering
//!
//! Narrows the device list down to the devices a run targets. Criteria are
//! applied with a fixed precedence:
//! 1. device names, when any are given
//! 2. otherwise platform name, optionally narrowed by platform version
//! 3. otherwise platform version alone
//! 4. otherwise every device

use super::DeviceProfile;
use crate::selection::DeviceBound;

/// Criteria for picking devices from the device list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    names: Vec<String>,
    platform_name: Option<String>,
    platform_version: Option<String>,
}

impl DeviceFilter {
    /// Build a filter from raw inputs
    ///
    /// `names` is a single device name or a comma-separated list. Empty or
    /// blank inputs are ignored.
    pub fn new(
        names: Option<&str>,
        platform_name: Option<&str>,
        platform_version: Option<&str>,
    ) -> Self {
        let mut parsed: Vec<String> = Vec::new();
        for name in names.unwrap_or_default().split(',').map(str::trim) {
            if !name.is_empty() && !parsed.iter().any(|n| n == name) {
                parsed.push(name.to_string());
            }
        }

        Self {
            names: parsed,
            platform_name: non_blank(platform_name),
            platform_version: non_blank(platform_version),
        }
    }

    /// Filter that keeps every device
    pub fn all() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn platform_name(&self) -> Option<&str> {
        self.platform_name.as_deref()
    }

    pub fn platform_version(&self) -> Option<&str> {
        self.platform_version.as_deref()
    }

    /// Apply the filter to a device list
    ///
    /// With names, devices come back grouped in requested-name order;
    /// otherwise in device-list order. Names and versions must match
    /// exactly, platform names case-insensitively.
    pub fn apply(&self, devices: &[DeviceProfile]) -> Vec<DeviceProfile> {
        let selected: Vec<DeviceProfile> = if !self.names.is_empty() {
            self.names
                .iter()
                .flat_map(|name| devices.iter().filter(move |d| d.name() == name.as_str()))
                .cloned()
                .collect()
        } else {
            devices
                .iter()
                .filter(|d| self.matches_platform(d) && self.matches_version(d))
                .cloned()
                .collect()
        };

        tracing::info!(
            device_names = ?self.names,
            platform_name = ?self.platform_name,
            platform_version = ?self.platform_version,
            available = devices.len(),
            selected = selected.len(),
            "Filtered device list"
        );

        selected
    }

    fn matches_platform(&self, device: &DeviceProfile) -> bool {
        match &self.platform_name {
            Some(platform) => device
                .platform_name()
                .is_some_and(|p| p.eq_ignore_ascii_case(platform)),
            None => true,
        }
    }

    fn matches_version(&self, device: &DeviceProfile) -> bool {
        match &self.platform_version {
            Some(version) => device.platform_version() == version.as_str(),
            None => true,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
