//! devicegate - Declarative test selection and device-matrix planning
//!
//! Decides which test methods of a mobile UI suite run, and on which devices,
//! from phase and tag criteria, per-class and per-method declarations and the
//! runtime device context of each test instance.

pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
pub mod metrics;
pub mod plan;
pub mod selection;
pub mod telemetry;
