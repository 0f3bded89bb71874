//! Suite manifest
//!
//! TOML description of the test classes and methods of a suite together with
//! their declarations. The manifest is the authored source a
//! [`DeclarationRegistry`] is built from when tests are not registered in
//! code.
//!
//! ```toml
//! [[class]]
//! name = "MultiDeviceExampleTest"
//!
//! [class.declaration]
//! tags = ["smoke"]
//!
//! [[class.method]]
//! name = "exampleAppiumTest"
//! declaration = { phase = ["regression"], device_type = ["phone"], platform = ["android", "ios"], tags = ["github"] }
//! ```

use super::declaration::TestDeclaration;
use super::registry::DeclarationRegistry;
use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

/// Root of a suite manifest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteManifest {
    #[serde(default, rename = "class")]
    classes: Vec<ClassManifest>,
}

/// One test class in the manifest
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassManifest {
    name: String,
    #[serde(default = "default_device_bound")]
    device_bound: bool,
    #[serde(default)]
    declaration: Option<TestDeclaration>,
    #[serde(default, rename = "method")]
    methods: Vec<MethodManifest>,
}

/// One test method in the manifest
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodManifest {
    name: String,
    #[serde(default)]
    declaration: Option<TestDeclaration>,
}

fn default_device_bound() -> bool {
    true
}

impl SuiteManifest {
    /// Load and validate a manifest from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ManifestFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let manifest: Self = toml::from_str(&content).map_err(|source| {
            AppError::ManifestParseFailed {
                path: path_display,
                source,
            }
        })?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Check class and method names
    ///
    /// Class names must be non-empty and unique; method names must be
    /// non-empty and unique within their class.
    pub fn validate(&self) -> AppResult<()> {
        let mut class_names = HashSet::new();
        for class in &self.classes {
            if class.name.trim().is_empty() {
                return Err(AppError::ManifestInvalid(
                    "class name must not be empty".to_string(),
                ));
            }
            if !class_names.insert(class.name.as_str()) {
                return Err(AppError::ManifestInvalid(format!(
                    "class '{}' is declared more than once",
                    class.name
                )));
            }

            let mut method_names = HashSet::new();
            for method in &class.methods {
                if method.name.trim().is_empty() {
                    return Err(AppError::ManifestInvalid(format!(
                        "class '{}' has a method with an empty name",
                        class.name
                    )));
                }
                if !method_names.insert(method.name.as_str()) {
                    return Err(AppError::ManifestInvalid(format!(
                        "method '{}.{}' is declared more than once",
                        class.name, method.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of classes in the manifest
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Build a registry holding every class and method of the manifest
    pub fn to_registry(&self) -> DeclarationRegistry {
        let mut registry = DeclarationRegistry::new();
        for class in &self.classes {
            if class.device_bound {
                registry.register_class(class.name.clone(), class.declaration.clone());
            } else {
                registry.register_unbound_class(class.name.clone(), class.declaration.clone());
            }
            for method in &class.methods {
                registry.register_method(
                    class.name.clone(),
                    method.name.clone(),
                    method.declaration.clone(),
                );
            }
        }

        tracing::debug!(
            classes = self.classes.len(),
            methods = registry.len(),
            "Built declaration registry from suite manifest"
        );
        registry
    }
}

impl FromStr for SuiteManifest {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let manifest: SuiteManifest =
            toml::from_str(toml_str).map_err(|source| AppError::ManifestParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        manifest.validate()?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{DeclarationSource, DeviceType, Phase, Platform, TestId};

    const TEST_MANIFEST: &str = r#"
[[class]]
name = "MultiDeviceExampleTest"

[class.declaration]
tags = ["smoke"]

[[class.method]]
name = "exampleAppiumTest"
declaration = { phase = ["REGRESSION"], devicetype = ["PHONE"], platform = ["ANDROID", "IOS"], tags = ["github"] }

[[class.method]]
name = "undeclaredTest"

[[class]]
name = "BackendContractTest"
device_bound = false

[[class.method]]
name = "healthCheck"
"#;

    #[test]
    fn test_manifest_parses() {
        let manifest = SuiteManifest::from_str(TEST_MANIFEST).expect("should parse manifest");
        assert_eq!(manifest.class_count(), 2);
    }

    #[test]
    fn test_manifest_to_registry() {
        let manifest = SuiteManifest::from_str(TEST_MANIFEST).expect("should parse manifest");
        let registry = manifest.to_registry();

        assert_eq!(registry.len(), 3);

        let id = TestId::new("MultiDeviceExampleTest", "exampleAppiumTest");
        let decl = registry.method_declaration(&id).expect("method declaration");
        assert!(decl.phases().unwrap().contains(&Phase::Regression));
        assert!(decl.device_types().unwrap().contains(&DeviceType::Phone));
        assert!(decl.platforms().unwrap().contains(&Platform::Ios));

        let class_decl = registry
            .class_declaration("MultiDeviceExampleTest")
            .expect("class declaration");
        assert!(class_decl.tags().unwrap().contains("smoke"));

        let undeclared = TestId::new("MultiDeviceExampleTest", "undeclaredTest");
        assert!(registry.method_declaration(&undeclared).is_none());

        let backend = registry.class("BackendContractTest").expect("class");
        assert!(!backend.is_device_bound());
        assert!(backend.declaration().is_none());
    }

    #[test]
    fn test_empty_manifest_is_valid() {
        let manifest = SuiteManifest::from_str("").expect("empty manifest should parse");
        assert_eq!(manifest.class_count(), 0);
        assert!(manifest.to_registry().is_empty());
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let toml = r#"
[[class]]
name = "LoginTest"

[[class]]
name = "LoginTest"
"#;
        let err = SuiteManifest::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("'LoginTest' is declared more than once"));
    }

    #[test]
    fn test_duplicate_method_rejected() {
        let toml = r#"
[[class]]
name = "LoginTest"

[[class.method]]
name = "validLogin"

[[class.method]]
name = "validLogin"
"#;
        let err = SuiteManifest::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("LoginTest.validLogin"));
    }

    #[test]
    fn test_empty_class_name_rejected() {
        let toml = r#"
[[class]]
name = "  "
"#;
        let err = SuiteManifest::from_str(toml).unwrap_err();
        assert!(matches!(err, AppError::ManifestInvalid(_)));
    }

    #[test]
    fn test_unknown_enum_value_is_parse_error() {
        let toml = r#"
[[class]]
name = "LoginTest"
declaration = { platform = ["blackberry"] }
"#;
        let err = SuiteManifest::from_str(toml).unwrap_err();
        assert!(matches!(err, AppError::ManifestParseFailed { .. }));
        assert!(err.to_string().contains("blackberry"));
    }
}
