//! Testing utilities for pipegraph pipelines.
//!
//! This module provides:
//! - Mock plugins that record their runs
//! - Descriptor and node fixtures
//! - Assertions on execution order

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_ran_before, assert_ran_exactly, assert_visits_each_once};
pub use fixtures::{failing_step, recording_registry, recording_step, step_descriptor};
pub use mocks::{ExecutionLog, ExecutionRecord, FailingPlugin, RecordingPlugin};
