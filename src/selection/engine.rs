//! Selection engine
//!
//! Decides which candidates of a run are eligible. All decisions are pure
//! CPU logic over read-only data: the filter criteria, the declarations and
//! the runtime context each candidate exposes.
//!
//! A candidate is eligible when all four predicates hold:
//! - phase: a requested phase names a declared phase (method or class)
//! - tags: a declared tag (method first, then class) is requested
//! - device type: the runtime device type is declared (method or class)
//! - platform: the runtime platform is declared (method or class)
//!
//! Unset criteria, unset runtime values and unset declarations all match.

use super::criteria::FilterCriteria;
use super::declaration::{TestDeclaration, TestId};
use super::registry::DeclarationSource;
use super::{Classifier, DeviceType, Dimension, Platform};
use crate::metrics::{Metrics, Outcome};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Runtime device context a test instance may expose
///
/// Instances that are not device-bound keep the defaults, and the device
/// type and platform predicates then never apply to them.
pub trait DeviceBound {
    /// Device type of the device this instance runs on (e.g. "phone")
    fn device_type(&self) -> Option<&str> {
        None
    }

    /// Platform name of the device this instance runs on (e.g. "Android")
    fn platform_name(&self) -> Option<&str> {
        None
    }
}

impl DeviceBound for () {}

impl<T: DeviceBound> DeviceBound for Option<T> {
    fn device_type(&self) -> Option<&str> {
        self.as_ref().and_then(|inner| inner.device_type())
    }

    fn platform_name(&self) -> Option<&str> {
        self.as_ref().and_then(|inner| inner.platform_name())
    }
}

impl<T: DeviceBound + ?Sized> DeviceBound for &T {
    fn device_type(&self) -> Option<&str> {
        (**self).device_type()
    }

    fn platform_name(&self) -> Option<&str> {
        (**self).platform_name()
    }
}

impl<T: DeviceBound + ?Sized> DeviceBound for Arc<T> {
    fn device_type(&self) -> Option<&str> {
        (**self).device_type()
    }

    fn platform_name(&self) -> Option<&str> {
        (**self).platform_name()
    }
}

/// Plain runtime context, for instances that carry only the device strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeContext {
    device_type: Option<String>,
    platform_name: Option<String>,
}

impl RuntimeContext {
    pub fn new(device_type: Option<&str>, platform_name: Option<&str>) -> Self {
        Self {
            device_type: device_type.map(str::to_string),
            platform_name: platform_name.map(str::to_string),
        }
    }

    /// Context of a test that is not bound to a device
    pub fn unbound() -> Self {
        Self::default()
    }
}

impl DeviceBound for RuntimeContext {
    fn device_type(&self) -> Option<&str> {
        self.device_type.as_deref()
    }

    fn platform_name(&self) -> Option<&str> {
        self.platform_name.as_deref()
    }
}

/// A discovered test method bound to its owning instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<I> {
    id: TestId,
    instance: I,
}

impl<I> Candidate<I> {
    pub fn new(id: TestId, instance: I) -> Self {
        Self { id, instance }
    }

    pub fn id(&self) -> &TestId {
        &self.id
    }

    pub fn instance(&self) -> &I {
        &self.instance
    }

    pub fn into_parts(self) -> (TestId, I) {
        (self.id, self.instance)
    }
}

/// Outcome of the four selection predicates for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub phase: bool,
    pub tags: bool,
    pub device_type: bool,
    pub platform: bool,
}

impl Verdict {
    /// True when every predicate holds
    pub fn is_eligible(&self) -> bool {
        self.phase && self.tags && self.device_type && self.platform
    }

    /// Dimensions whose predicate failed
    pub fn rejected(&self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|dimension| !self.holds(*dimension))
            .collect()
    }

    fn holds(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Phase => self.phase,
            Dimension::Tags => self.tags,
            Dimension::DeviceType => self.device_type,
            Dimension::Platform => self.platform,
        }
    }
}

/// Selects the eligible candidates of a run
///
/// Built once per run from explicit criteria; it never reads process-wide
/// state, so it can be driven with synthetic criteria and declarations.
pub struct SelectionEngine<S> {
    criteria: FilterCriteria,
    declarations: S,
    metrics: Option<Arc<Metrics>>,
}

impl<S: DeclarationSource> SelectionEngine<S> {
    pub fn new(criteria: FilterCriteria, declarations: S) -> Self {
        Self {
            criteria,
            declarations,
            metrics: None,
        }
    }

    /// Record selection outcomes into the given metrics
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Keep the eligible candidates, in their original order
    ///
    /// Never fails: a candidate with unusable runtime data is reported and
    /// skipped, and the remaining candidates are still evaluated.
    pub fn select<I: DeviceBound>(&self, candidates: Vec<Candidate<I>>) -> Vec<Candidate<I>> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let total = candidates.len();

        tracing::debug!(
            run_id = %run_id,
            candidates = total,
            criteria = %self.criteria,
            "Starting selection pass"
        );

        let selected: Vec<Candidate<I>> = candidates
            .into_iter()
            .filter(|candidate| self.evaluate(candidate).is_eligible())
            .collect();

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Some(metrics) = &self.metrics
            && let Err(e) = metrics.record_selection_duration(duration_ms)
        {
            tracing::warn!(error = %e, "Failed to record selection duration");
            metrics.metrics_recording_failure("record_selection_duration");
        }

        tracing::info!(
            run_id = %run_id,
            candidates = total,
            selected = selected.len(),
            skipped = total - selected.len(),
            duration_ms,
            "Selection pass complete"
        );

        selected
    }

    /// Evaluate the four predicates for one candidate
    ///
    /// Emits one info record with all four outcomes before returning.
    pub fn evaluate<I: DeviceBound>(&self, candidate: &Candidate<I>) -> Verdict {
        let id = candidate.id();
        let class = self.declarations.class_declaration(id.class());
        let method = self.declarations.method_declaration(id);
        let instance = candidate.instance();

        let verdict = Verdict {
            phase: self.phase_matches(class, method),
            tags: self.tags_match(class, method),
            device_type: runtime_matches::<DeviceType>(
                id,
                instance.device_type(),
                class.and_then(TestDeclaration::device_types),
                method.and_then(TestDeclaration::device_types),
                self.metrics.as_deref(),
            ),
            platform: runtime_matches::<Platform>(
                id,
                instance.platform_name(),
                class.and_then(TestDeclaration::platforms),
                method.and_then(TestDeclaration::platforms),
                self.metrics.as_deref(),
            ),
        };

        tracing::info!(
            test = %id,
            phases = verdict.phase,
            tags = verdict.tags,
            device_type = verdict.device_type,
            platform = verdict.platform,
            "Test matching group values"
        );

        if let Some(metrics) = &self.metrics {
            self.record_verdict(metrics, &verdict);
        }

        verdict
    }

    fn phase_matches(
        &self,
        class: Option<&TestDeclaration>,
        method: Option<&TestDeclaration>,
    ) -> bool {
        let Some(requested) = self.criteria.phases() else {
            return true;
        };
        let method_phases = method.and_then(TestDeclaration::phases);
        let class_phases = class.and_then(TestDeclaration::phases);

        requested.iter().any(|phase| {
            names_member(method_phases, phase) || names_member(class_phases, phase)
        })
    }

    fn tags_match(&self, class: Option<&TestDeclaration>, method: Option<&TestDeclaration>) -> bool {
        let Some(requested) = self.criteria.tags() else {
            return true;
        };

        // Method tags first, then the class tags as fallback
        [method, class]
            .into_iter()
            .flatten()
            .filter_map(TestDeclaration::tags)
            .any(|declared| declared.iter().any(|tag| requested.contains(tag)))
    }

    fn record_verdict(&self, metrics: &Metrics, verdict: &Verdict) {
        let outcome = if verdict.is_eligible() {
            Outcome::Selected
        } else {
            Outcome::Skipped
        };
        if let Err(e) = metrics.record_candidate(outcome) {
            tracing::warn!(error = %e, outcome = outcome.as_str(), "Failed to record candidate");
            metrics.metrics_recording_failure("record_candidate");
        }
        for dimension in verdict.rejected() {
            if let Err(e) = metrics.record_rejection(dimension) {
                tracing::warn!(error = %e, dimension = %dimension, "Failed to record rejection");
                metrics.metrics_recording_failure("record_rejection");
            }
        }
    }
}

/// Case-insensitive check that `name` names a member of a declared set
fn names_member<T: Classifier>(declared: Option<&BTreeSet<T>>, name: &str) -> bool {
    declared.is_some_and(|set| set.iter().any(|member| member.as_str().eq_ignore_ascii_case(name)))
}

/// Device-type and platform predicate
///
/// Applies only when the instance reports a runtime value and at least one
/// of the two declarations constrains the dimension.
fn runtime_matches<T: Classifier>(
    id: &TestId,
    runtime: Option<&str>,
    class: Option<&BTreeSet<T>>,
    method: Option<&BTreeSet<T>>,
    metrics: Option<&Metrics>,
) -> bool {
    let Some(raw) = runtime else {
        return true;
    };
    if class.is_none() && method.is_none() {
        return true;
    }

    let Some(value) = T::from_runtime(raw) else {
        tracing::error!(
            test = %id,
            dimension = %T::DIMENSION,
            value = raw,
            "The {} provided is invalid",
            T::DIMENSION
        );
        if let Some(metrics) = metrics
            && let Err(e) = metrics.record_unknown_runtime_value(T::DIMENSION)
        {
            tracing::warn!(error = %e, "Failed to record unknown runtime value");
            metrics.metrics_recording_failure("record_unknown_runtime_value");
        }
        return false;
    };

    method.is_some_and(|set| set.contains(&value)) || class.is_some_and(|set| set.contains(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{DeclarationRegistry, Phase};

    fn candidate(class: &str, method: &str, device: Option<&str>, platform: Option<&str>) -> Candidate<RuntimeContext> {
        Candidate::new(TestId::new(class, method), RuntimeContext::new(device, platform))
    }

    fn build_engine(criteria: FilterCriteria, registry: &DeclarationRegistry) -> SelectionEngine<&DeclarationRegistry> {
        SelectionEngine::new(criteria, registry)
    }

    // Phase predicate

    #[test]
    fn test_no_phase_criteria_always_matches() {
        let registry = DeclarationRegistry::new();
        let verdict = build_engine(FilterCriteria::unfiltered(), &registry)
            .evaluate(&candidate("A", "a", None, None));
        assert!(verdict.phase);
    }

    #[test]
    fn test_method_phase_matches_case_insensitively() {
        let mut registry = DeclarationRegistry::new();
        registry.register_method(
            "A",
            "a",
            Some(TestDeclaration::new().with_phases([Phase::Regression])),
        );
        let verdict = build_engine(FilterCriteria::new(Some("REGRESSION"), None), &registry)
            .evaluate(&candidate("A", "a", None, None));
        assert!(verdict.phase);
    }

    #[test]
    fn test_class_phase_matches() {
        let mut registry = DeclarationRegistry::new();
        registry
            .register_class("A", Some(TestDeclaration::new().with_phases([Phase::Smoke])))
            .register_method("A", "a", None);
        let verdict = build_engine(FilterCriteria::new(Some("sanity,smoke"), None), &registry)
            .evaluate(&candidate("A", "a", None, None));
        assert!(verdict.phase);
    }

    #[test]
    fn test_phase_criteria_without_declarations_rejects() {
        let registry = DeclarationRegistry::new();
        let verdict = build_engine(FilterCriteria::new(Some("smoke"), None), &registry)
            .evaluate(&candidate("A", "a", None, None));
        assert!(!verdict.phase);
        assert_eq!(verdict.rejected(), vec![Dimension::Phase]);
    }

    #[test]
    fn test_placeholder_phase_is_not_selectable() {
        let mut registry = DeclarationRegistry::new();
        registry.register_method(
            "A",
            "a",
            Some(TestDeclaration::new().with_phases([Phase::NotDefined])),
        );
        let verdict = build_engine(FilterCriteria::new(Some("not_defined"), None), &registry)
            .evaluate(&candidate("A", "a", None, None));
        assert!(!verdict.phase);
    }

    // Tag predicate

    #[test]
    fn test_method_tag_matches() {
        let mut registry = DeclarationRegistry::new();
        registry.register_method("A", "a", Some(TestDeclaration::new().with_tags(["login"])));
        let verdict = build_engine(FilterCriteria::new(None, Some("login")), &registry)
            .evaluate(&candidate("A", "a", None, None));
        assert!(verdict.tags);
    }

    #[test]
    fn test_class_tags_are_the_fallback() {
        let mut registry = DeclarationRegistry::new();
        registry
            .register_class("A", Some(TestDeclaration::new().with_tags(["smoke", "github"])))
            .register_method("A", "a", Some(TestDeclaration::new().with_tags(["login"])));
        let verdict = build_engine(FilterCriteria::new(None, Some("github")), &registry)
            .evaluate(&candidate("A", "a", None, None));
        assert!(verdict.tags);
    }

    #[test]
    fn test_declared_tags_compare_case_insensitively() {
        let mut registry = DeclarationRegistry::new();
        registry.register_method("A", "a", Some(TestDeclaration::new().with_tags(["GitHub"])));
        let verdict = build_engine(FilterCriteria::new(None, Some("GITHUB")), &registry)
            .evaluate(&candidate("A", "a", None, None));
        assert!(verdict.tags);
    }

    #[test]
    fn test_empty_tag_token_matches_nothing() {
        let mut registry = DeclarationRegistry::new();
        registry.register_method("A", "a", Some(TestDeclaration::new().with_tags([""])));
        let verdict = build_engine(FilterCriteria::new(None, Some(" , ")), &registry)
            .evaluate(&candidate("A", "a", None, None));
        assert!(!verdict.tags);
    }

    // Device type and platform predicates

    #[test]
    fn test_unbound_instance_ignores_device_constraints() {
        let mut registry = DeclarationRegistry::new();
        registry.register_method(
            "A",
            "a",
            Some(
                TestDeclaration::new()
                    .with_device_types([DeviceType::Tablet])
                    .with_platforms([Platform::Ios]),
            ),
        );
        let verdict = build_engine(FilterCriteria::unfiltered(), &registry)
            .evaluate(&candidate("A", "a", None, None));
        assert!(verdict.device_type);
        assert!(verdict.platform);
    }

    #[test]
    fn test_device_type_mismatch_rejects() {
        let mut registry = DeclarationRegistry::new();
        registry.register_method(
            "A",
            "a",
            Some(TestDeclaration::new().with_device_types([DeviceType::Tablet])),
        );
        let verdict = build_engine(FilterCriteria::unfiltered(), &registry)
            .evaluate(&candidate("A", "a", Some("phone"), None));
        assert!(!verdict.device_type);
        assert!(verdict.platform);
    }

    #[test]
    fn test_device_type_matches_class_or_method() {
        let mut registry = DeclarationRegistry::new();
        registry
            .register_class("A", Some(TestDeclaration::new().with_device_types([DeviceType::Phone])))
            .register_method(
                "A",
                "a",
                Some(TestDeclaration::new().with_device_types([DeviceType::Tablet])),
            );
        let engine = build_engine(FilterCriteria::unfiltered(), &registry);
        assert!(engine.evaluate(&candidate("A", "a", Some("PHONE"), None)).device_type);
        assert!(engine.evaluate(&candidate("A", "a", Some("tablet"), None)).device_type);
    }

    #[test]
    fn test_unknown_platform_rejects_and_counts() {
        let mut registry = DeclarationRegistry::new();
        registry.register_method(
            "A",
            "a",
            Some(TestDeclaration::new().with_platforms([Platform::Android])),
        );
        let metrics = Arc::new(Metrics::new().expect("metrics"));
        let engine = build_engine(FilterCriteria::unfiltered(), &registry).with_metrics(metrics.clone());

        let verdict = engine.evaluate(&candidate("A", "a", None, Some("blackberry")));
        assert!(!verdict.platform);
        assert_eq!(metrics.unknown_runtime_values_count(Dimension::Platform), 1);
        assert_eq!(metrics.rejections_count(Dimension::Platform), 1);
        assert_eq!(metrics.candidates_count(Outcome::Skipped), 1);
    }

    #[test]
    fn test_unknown_value_without_constraint_matches() {
        let registry = DeclarationRegistry::new();
        let metrics = Arc::new(Metrics::new().expect("metrics"));
        let engine = build_engine(FilterCriteria::unfiltered(), &registry).with_metrics(metrics.clone());

        let verdict = engine.evaluate(&candidate("A", "a", Some("watch"), Some("blackberry")));
        assert!(verdict.is_eligible());
        assert_eq!(metrics.unknown_runtime_values_count(Dimension::DeviceType), 0);
    }

    #[test]
    fn test_runtime_placeholder_counts_as_unknown() {
        let mut registry = DeclarationRegistry::new();
        registry.register_method(
            "A",
            "a",
            Some(TestDeclaration::new().with_device_types([DeviceType::Phone, DeviceType::NotDefined])),
        );
        let verdict = build_engine(FilterCriteria::unfiltered(), &registry)
            .evaluate(&candidate("A", "a", Some("not_defined"), None));
        assert!(!verdict.device_type);
    }

    // Verdict

    #[test]
    fn test_verdict_rejected_lists_failed_dimensions() {
        let verdict = Verdict {
            phase: false,
            tags: true,
            device_type: false,
            platform: true,
        };
        assert!(!verdict.is_eligible());
        assert_eq!(verdict.rejected(), vec![Dimension::Phase, Dimension::DeviceType]);
    }

    // select

    #[test]
    fn test_select_preserves_order() {
        let mut registry = DeclarationRegistry::new();
        registry
            .register_method("A", "a", Some(TestDeclaration::new().with_tags(["keep"])))
            .register_method("A", "b", None)
            .register_method("A", "c", Some(TestDeclaration::new().with_tags(["keep"])));
        let candidates = vec![
            candidate("A", "c", None, None),
            candidate("A", "b", None, None),
            candidate("A", "a", None, None),
        ];

        let selected = build_engine(FilterCriteria::new(None, Some("keep")), &registry).select(candidates);
        let methods: Vec<&str> = selected.iter().map(|c| c.id().method()).collect();
        assert_eq!(methods, vec!["c", "a"]);
    }

    #[test]
    fn test_select_records_outcomes() {
        let mut registry = DeclarationRegistry::new();
        registry.register_method("A", "a", Some(TestDeclaration::new().with_tags(["keep"])));
        let metrics = Arc::new(Metrics::new().expect("metrics"));
        let engine = build_engine(FilterCriteria::new(None, Some("keep")), &registry)
            .with_metrics(metrics.clone());

        engine.select(vec![candidate("A", "a", None, None), candidate("A", "b", None, None)]);

        assert_eq!(metrics.candidates_count(Outcome::Selected), 1);
        assert_eq!(metrics.candidates_count(Outcome::Skipped), 1);
        assert_eq!(metrics.rejections_count(Dimension::Tags), 1);
    }

    #[test]
    fn test_option_and_unit_instances_are_unbound() {
        assert!(().device_type().is_none());
        let none: Option<RuntimeContext> = None;
        assert!(none.platform_name().is_none());
        let some = Some(RuntimeContext::new(Some("phone"), Some("ios")));
        assert_eq!(some.device_type(), Some("phone"));
        assert_eq!(some.platform_name(), Some("ios"));
    }
}
