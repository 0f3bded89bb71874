//! Desired capability merging
//!
//! Builds the capability map a remote session would be opened with. Later
//! sources override earlier ones: the configured defaults, then the device
//! columns, then the device's own extra capabilities, then the test name.

use super::DeviceProfile;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Capability key carrying the name of the test class
pub const TEST_NAME_CAPABILITY: &str = "testobject_test_name";

/// Merge default and device-specific capabilities for one test class
///
/// Empty values are skipped. The device `name` column is not a capability.
pub fn desired_capabilities(
    defaults: &BTreeMap<String, String>,
    device: &DeviceProfile,
    test_name: &str,
) -> Map<String, Value> {
    let mut capabilities = Map::new();

    for (key, value) in defaults {
        insert_non_empty(&mut capabilities, key, Value::String(value.clone()));
    }

    for (key, value) in [
        ("deviceType", &device.device_type),
        ("platformName", &device.platform_name),
        ("platformVersion", &device.platform_version),
    ] {
        insert_non_empty(&mut capabilities, key, Value::String(value.clone()));
    }

    for (key, value) in device.capabilities() {
        if key.eq_ignore_ascii_case("name") {
            continue;
        }
        insert_non_empty(&mut capabilities, key, value.clone());
    }

    capabilities.insert(
        TEST_NAME_CAPABILITY.to_string(),
        Value::String(test_name.to_string()),
    );
    capabilities
}

fn insert_non_empty(capabilities: &mut Map<String, Value>, key: &str, value: Value) {
    let empty = match &value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    };
    if !empty {
        capabilities.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> BTreeMap<String, String> {
        [
            ("appiumVersion", "2.0"),
            ("platformName", "Android"),
            ("browserName", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_device_columns_override_defaults() {
        let device = DeviceProfile::new("iPhone 15", "phone", "iOS", "17");
        let caps = desired_capabilities(&defaults(), &device, "LoginTest");

        assert_eq!(caps.get("appiumVersion"), Some(&json!("2.0")));
        assert_eq!(caps.get("platformName"), Some(&json!("iOS")));
        assert_eq!(caps.get("platformVersion"), Some(&json!("17")));
        assert_eq!(caps.get("deviceType"), Some(&json!("phone")));
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let device = DeviceProfile::new("Pixel 7", "phone", "Android", "");
        let caps = desired_capabilities(&defaults(), &device, "LoginTest");

        assert!(!caps.contains_key("browserName"));
        assert!(!caps.contains_key("platformVersion"));
    }

    #[test]
    fn test_device_extras_and_test_name() {
        let device = DeviceProfile::new("Pixel 7", "phone", "Android", "14")
            .with_capability("orientation", json!("PORTRAIT"))
            .with_capability("name", json!("ignored"))
            .with_capability("newCommandTimeout", json!(120));
        let caps = desired_capabilities(&BTreeMap::new(), &device, "MultiDeviceExampleTest");

        assert_eq!(caps.get("orientation"), Some(&json!("PORTRAIT")));
        assert_eq!(caps.get("newCommandTimeout"), Some(&json!(120)));
        assert!(!caps.contains_key("name"));
        assert_eq!(
            caps.get(TEST_NAME_CAPABILITY),
            Some(&json!("MultiDeviceExampleTest"))
        );
    }

    #[test]
    fn test_device_name_is_not_a_capability() {
        let device = DeviceProfile::new("Pixel 7", "phone", "Android", "14");
        let caps = desired_capabilities(&BTreeMap::new(), &device, "LoginTest");
        assert!(caps.values().all(|v| v != &json!("Pixel 7")));
    }
}
