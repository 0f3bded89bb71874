//! Declarative test metadata
//!
//! A [`TestDeclaration`] is authored against a test class or a single test
//! method. Every field is optional; a field holding only the placeholder
//! member (`not_defined`) is the same as leaving it out.

use super::{Classifier, DeviceType, Phase, Platform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a test method: owning class plus method name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TestId {
    class: String,
    method: String,
}

impl TestId {
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.method)
    }
}

/// Phase, tag, device-type and platform metadata of a test class or method
///
/// Fields are private so that every instance is normalised: placeholders are
/// dropped, tags are trimmed and lowercased, and empty sets collapse to
/// `None`. Deserialization goes through the same normalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DeclarationFields")]
pub struct TestDeclaration {
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<BTreeSet<Phase>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_type: Option<BTreeSet<DeviceType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    platform: Option<BTreeSet<Platform>>,
}

/// Raw declaration as authored, before normalisation
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclarationFields {
    #[serde(default)]
    phase: Option<Vec<Phase>>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default, alias = "devicetype")]
    device_type: Option<Vec<DeviceType>>,
    #[serde(default)]
    platform: Option<Vec<Platform>>,
}

impl From<DeclarationFields> for TestDeclaration {
    fn from(fields: DeclarationFields) -> Self {
        Self {
            phase: fields.phase.and_then(normalize_members),
            tags: fields.tags.and_then(normalize_tags),
            device_type: fields.device_type.and_then(normalize_members),
            platform: fields.platform.and_then(normalize_members),
        }
    }
}

impl TestDeclaration {
    /// Create a declaration with every field unset
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the phases this test belongs to
    pub fn with_phases(mut self, phases: impl IntoIterator<Item = Phase>) -> Self {
        self.phase = normalize_members(phases);
        self
    }

    /// Set the free-form tags of this test
    pub fn with_tags<S: AsRef<str>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = normalize_tags(tags);
        self
    }

    /// Set the device types this test may run on
    pub fn with_device_types(mut self, device_types: impl IntoIterator<Item = DeviceType>) -> Self {
        self.device_type = normalize_members(device_types);
        self
    }

    /// Set the platforms this test may run on
    pub fn with_platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> Self {
        self.platform = normalize_members(platforms);
        self
    }

    pub fn phases(&self) -> Option<&BTreeSet<Phase>> {
        self.phase.as_ref()
    }

    pub fn tags(&self) -> Option<&BTreeSet<String>> {
        self.tags.as_ref()
    }

    pub fn device_types(&self) -> Option<&BTreeSet<DeviceType>> {
        self.device_type.as_ref()
    }

    pub fn platforms(&self) -> Option<&BTreeSet<Platform>> {
        self.platform.as_ref()
    }

    /// True when no field carries an explicit value
    pub fn is_empty(&self) -> bool {
        self.phase.is_none()
            && self.tags.is_none()
            && self.device_type.is_none()
            && self.platform.is_none()
    }
}

fn normalize_members<T: Classifier>(members: impl IntoIterator<Item = T>) -> Option<BTreeSet<T>> {
    let set: BTreeSet<T> = members
        .into_iter()
        .filter(|member| !member.is_placeholder())
        .collect();
    (!set.is_empty()).then_some(set)
}

fn normalize_tags<S: AsRef<str>>(tags: impl IntoIterator<Item = S>) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = tags
        .into_iter()
        .map(|tag| tag.as_ref().trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();
    (!set.is_empty()).then_some(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_id_display() {
        let id = TestId::new("MultiDeviceExampleTest", "exampleAppiumTest");
        assert_eq!(id.to_string(), "MultiDeviceExampleTest.exampleAppiumTest");
        assert_eq!(id.class(), "MultiDeviceExampleTest");
        assert_eq!(id.method(), "exampleAppiumTest");
    }

    #[test]
    fn test_new_declaration_is_empty() {
        let decl = TestDeclaration::new();
        assert!(decl.is_empty());
        assert!(decl.phases().is_none());
        assert!(decl.tags().is_none());
        assert!(decl.device_types().is_none());
        assert!(decl.platforms().is_none());
    }

    #[test]
    fn test_placeholder_only_collapses_to_none() {
        let decl = TestDeclaration::new()
            .with_phases([Phase::NotDefined])
            .with_device_types([DeviceType::NotDefined])
            .with_platforms([Platform::NotDefined]);
        assert_eq!(decl, TestDeclaration::new());
    }

    #[test]
    fn test_placeholder_is_dropped_from_mixed_sets() {
        let decl = TestDeclaration::new().with_device_types([DeviceType::Phone, DeviceType::NotDefined]);
        let expected: BTreeSet<_> = [DeviceType::Phone].into_iter().collect();
        assert_eq!(decl.device_types(), Some(&expected));
    }

    #[test]
    fn test_tags_are_normalized() {
        let decl = TestDeclaration::new().with_tags([" GitHub ", "", "smoke"]);
        let expected: BTreeSet<String> = ["github", "smoke"].iter().map(|t| t.to_string()).collect();
        assert_eq!(decl.tags(), Some(&expected));
    }

    #[test]
    fn test_default_tag_collapses_to_none() {
        let decl = TestDeclaration::new().with_tags([""]);
        assert!(decl.tags().is_none());
    }

    #[test]
    fn test_deserialize_normalizes() {
        let decl: TestDeclaration = toml::from_str(
            r#"
phase = ["REGRESSION"]
tags = ["GitHub"]
devicetype = ["not_defined"]
platform = ["android", "IOS"]
"#,
        )
        .expect("should parse declaration");

        let phases: BTreeSet<_> = [Phase::Regression].into_iter().collect();
        let platforms: BTreeSet<_> = [Platform::Android, Platform::Ios].into_iter().collect();
        assert_eq!(decl.phases(), Some(&phases));
        assert_eq!(decl.tags().map(|t| t.contains("github")), Some(true));
        assert!(decl.device_types().is_none());
        assert_eq!(decl.platforms(), Some(&platforms));
    }

    #[test]
    fn test_deserialize_rejects_unknown_field() {
        let result: Result<TestDeclaration, _> = toml::from_str(r#"priority = ["high"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rejects_unknown_member() {
        let result: Result<TestDeclaration, _> = toml::from_str(r#"platform = ["windows"]"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("windows"), "got: {}", err);
    }
}
