//! Test selection for devicegate
//!
//! Decides, for every discovered test method, whether it runs in this pass.
//! Decisions combine the process-wide [`FilterCriteria`] with the declarations
//! authored against each test class and method, and with the runtime device
//! context of the test instance.

pub mod criteria;
pub mod declaration;
pub mod engine;
pub mod manifest;
pub mod registry;

pub use criteria::FilterCriteria;
pub use declaration::{TestDeclaration, TestId};
pub use engine::{Candidate, DeviceBound, RuntimeContext, SelectionEngine, Verdict};
pub use manifest::SuiteManifest;
pub use registry::{DeclarationRegistry, DeclarationSource};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Selection dimension a predicate filters on
///
/// Used as the label for diagnostics and metrics, so the set of values is
/// closed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Phase,
    Tags,
    DeviceType,
    Platform,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Phase,
        Dimension::Tags,
        Dimension::DeviceType,
        Dimension::Platform,
    ];

    /// Convert to string representation for logging and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phase => "phase",
            Self::Tags => "tags",
            Self::DeviceType => "device_type",
            Self::Platform => "platform",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enumerated classifier that can appear in a test declaration
///
/// Each classifier has a placeholder member meaning "not explicitly set".
/// Declarations normalise the placeholder away, so it is never a value a
/// test can be selected by.
pub trait Classifier: Copy + Ord + fmt::Debug + 'static {
    /// Which selection dimension this classifier belongs to
    const DIMENSION: Dimension;

    /// Every member, placeholder included
    const ALL: &'static [Self];

    /// The "not explicitly set" member
    const PLACEHOLDER: Self;

    /// Canonical lowercase name
    fn as_str(&self) -> &'static str;

    fn is_placeholder(&self) -> bool {
        *self == Self::PLACEHOLDER
    }

    /// Case-insensitive lookup by name, placeholder included
    fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|member| member.as_str().eq_ignore_ascii_case(name))
    }

    /// Lookup for a value reported by a running device
    ///
    /// A device never reports the placeholder, so it is treated as unknown.
    fn from_runtime(value: &str) -> Option<Self> {
        Self::from_name(value).filter(|member| !member.is_placeholder())
    }
}

macro_rules! impl_classifier {
    ($ty:ident, $dimension:expr, $placeholder:expr, [$($variant:ident => $name:literal),+ $(,)?]) => {
        impl Classifier for $ty {
            const DIMENSION: Dimension = $dimension;
            const ALL: &'static [Self] = &[$($ty::$variant),+];
            const PLACEHOLDER: Self = $placeholder;

            fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty as Classifier>::from_name(s).ok_or_else(|| {
                    let known: Vec<&str> = <$ty as Classifier>::ALL
                        .iter()
                        .map(|member| member.as_str())
                        .collect();
                    format!(
                        "unknown {} '{}', expected one of: {}",
                        $dimension.as_str(),
                        s,
                        known.join(", ")
                    )
                })
            }
        }

        impl TryFrom<String> for $ty {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_string()
            }
        }
    };
}

/// Stage of a suite run a test belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Phase {
    Smoke,
    Sanity,
    Regression,
    NotDefined,
}

impl_classifier!(Phase, Dimension::Phase, Phase::NotDefined, [
    Smoke => "smoke",
    Sanity => "sanity",
    Regression => "regression",
    NotDefined => "not_defined",
]);

/// Form factor of the target device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceType {
    Phone,
    Tablet,
    NotDefined,
}

impl_classifier!(DeviceType, Dimension::DeviceType, DeviceType::NotDefined, [
    Phone => "phone",
    Tablet => "tablet",
    NotDefined => "not_defined",
]);

/// Operating system of the target device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Platform {
    Android,
    Ios,
    NotDefined,
}

impl_classifier!(Platform, Dimension::Platform, Platform::NotDefined, [
    Android => "android",
    Ios => "ios",
    NotDefined => "not_defined",
]);
