//! Run planning
//!
//! Expands the registered test classes into candidates, one instance per
//! target device for device-bound classes, runs the selection pass once and
//! renders what will execute where.

use crate::devices::{DeviceProfile, desired_capabilities};
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::selection::{Candidate, DeclarationRegistry, FilterCriteria, SelectionEngine, TestId};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One test that survived selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedTest {
    pub class: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub capabilities: Map<String, Value>,
}

/// Result of planning a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunPlan {
    pub criteria: String,
    pub devices: Vec<String>,
    pub candidates: usize,
    pub skipped: usize,
    pub tests: Vec<PlannedTest>,
}

impl RunPlan {
    /// Render the plan as pretty-printed JSON
    pub fn to_json(&self) -> AppResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Output(format!("failed to serialize run plan: {}", e)))
    }

    /// Render the plan as one line per planned test
    pub fn render_text(&self) -> String {
        let devices = if self.devices.is_empty() {
            "(none)".to_string()
        } else {
            self.devices.join(", ")
        };

        let mut out = format!(
            "criteria: {}\ndevices: {}\nselected {} of {} candidates ({} skipped)\n",
            self.criteria,
            devices,
            self.tests.len(),
            self.candidates,
            self.skipped
        );
        for test in &self.tests {
            let line = match &test.device {
                Some(device) => format!("  {}.{} @ {}\n", test.class, test.method, device),
                None => format!("  {}.{}\n", test.class, test.method),
            };
            out.push_str(&line);
        }
        out
    }
}

/// Builds run plans for a fixed set of criteria and target devices
pub struct RunPlanner {
    criteria: FilterCriteria,
    devices: Vec<DeviceProfile>,
    default_capabilities: BTreeMap<String, String>,
    metrics: Option<Arc<Metrics>>,
}

impl RunPlanner {
    /// Create a planner
    ///
    /// `devices` is the already-filtered list of devices the run targets.
    pub fn new(
        criteria: FilterCriteria,
        devices: Vec<DeviceProfile>,
        default_capabilities: BTreeMap<String, String>,
    ) -> Self {
        Self {
            criteria,
            devices,
            default_capabilities,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Expand the registry into candidates
    ///
    /// Device-bound classes get one instance per device, classes in
    /// registration order, then devices, then methods. A class that is not
    /// device-bound, or a run with no devices, gets a single unbound
    /// instance.
    pub fn candidates(
        &self,
        registry: &DeclarationRegistry,
    ) -> Vec<Candidate<Option<&DeviceProfile>>> {
        let mut candidates = Vec::new();
        for class in registry.classes() {
            let instances: Vec<Option<&DeviceProfile>> =
                if class.is_device_bound() && !self.devices.is_empty() {
                    self.devices.iter().map(Some).collect()
                } else {
                    vec![None]
                };

            for instance in instances {
                for method in class.methods() {
                    candidates.push(Candidate::new(
                        TestId::new(class.name(), method.name()),
                        instance,
                    ));
                }
            }
        }
        candidates
    }

    /// Run the selection pass over every registered test
    pub fn plan(&self, registry: &DeclarationRegistry) -> RunPlan {
        let mut engine = SelectionEngine::new(self.criteria.clone(), registry);
        if let Some(metrics) = &self.metrics {
            engine = engine.with_metrics(Arc::clone(metrics));
        }

        let candidates = self.candidates(registry);
        let total = candidates.len();
        let selected = engine.select(candidates);

        let tests: Vec<PlannedTest> = selected
            .into_iter()
            .map(|candidate| {
                let (id, device) = candidate.into_parts();
                let capabilities = device
                    .map(|d| desired_capabilities(&self.default_capabilities, d, id.class()))
                    .unwrap_or_default();
                PlannedTest {
                    class: id.class().to_string(),
                    method: id.method().to_string(),
                    device: device.map(|d| d.name().to_string()),
                    capabilities,
                }
            })
            .collect();

        RunPlan {
            criteria: self.criteria.to_string(),
            devices: self.devices.iter().map(|d| d.name().to_string()).collect(),
            candidates: total,
            skipped: total - tests.len(),
            tests,
        }
    }
}
