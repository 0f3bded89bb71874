//! Process-wide filter criteria
//!
//! Parsed once from comma-separated strings and never mutated afterwards.

use std::collections::BTreeSet;
use std::fmt;

/// Phase and tag filters requested for a run
///
/// Each dimension is either absent (no filter requested, always matches) or a
/// set of trimmed, lowercase values. A requested set may contain the empty
/// string when the input had empty tokens; such a token matches nothing.
///
/// Requesting the `not_defined` phase selects nothing: declarations never
/// carry the placeholder, so no test can match it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    phases: Option<BTreeSet<String>>,
    tags: Option<BTreeSet<String>>,
}

impl FilterCriteria {
    /// Build criteria from the raw comma-separated phase and tag inputs
    ///
    /// `None` or an empty string leaves the dimension unfiltered.
    pub fn new(phases: Option<&str>, tags: Option<&str>) -> Self {
        Self {
            phases: parse_list(phases),
            tags: parse_list(tags),
        }
    }

    /// Criteria that select every test
    pub fn unfiltered() -> Self {
        Self::default()
    }

    /// Requested phases, if a phase filter was given
    pub fn phases(&self) -> Option<&BTreeSet<String>> {
        self.phases.as_ref()
    }

    /// Requested tags, if a tag filter was given
    pub fn tags(&self) -> Option<&BTreeSet<String>> {
        self.tags.as_ref()
    }

    pub fn is_unfiltered(&self) -> bool {
        self.phases.is_none() && self.tags.is_none()
    }
}

impl fmt::Display for FilterCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn render(set: Option<&BTreeSet<String>>) -> String {
            match set {
                Some(values) => values.iter().cloned().collect::<Vec<_>>().join(","),
                None => "*".to_string(),
            }
        }
        write!(
            f,
            "phases=[{}] tags=[{}]",
            render(self.phases()),
            render(self.tags())
        )
    }
}

/// Split a comma-separated list into a set of trimmed lowercase tokens
///
/// Returns `None` when no input was given. A non-empty input always yields a
/// set, even if every token is empty after trimming.
pub fn parse_list(raw: Option<&str>) -> Option<BTreeSet<String>> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }
    Some(
        raw.to_lowercase()
            .split(',')
            .map(|token| token.trim().to_string())
            .collect(),
    )
}
