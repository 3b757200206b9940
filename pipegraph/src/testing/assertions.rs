//! Test assertions for pipeline runs.

use std::collections::HashSet;

use crate::nodes::NodeId;
use crate::pipeline::Pipeline;

use super::mocks::ExecutionLog;

/// Asserts that step `first` ran before step `second`.
pub fn assert_ran_before(log: &ExecutionLog, first: &str, second: &str) {
    let steps = log.steps();
    let a = steps.iter().position(|s| s == first);
    let b = steps.iter().position(|s| s == second);
    assert!(
        matches!((a, b), (Some(a), Some(b)) if a < b),
        "Expected '{first}' to run before '{second}', got {steps:?}"
    );
}

/// Asserts the exact sequence of steps that ran.
pub fn assert_ran_exactly(log: &ExecutionLog, expected: &[&str]) {
    let steps = log.steps();
    assert_eq!(
        steps, expected,
        "Expected steps {expected:?}, got {steps:?}"
    );
}

/// Asserts that a traversal lists each reachable vertex exactly once.
pub fn assert_visits_each_once(pipeline: &Pipeline, order: &[NodeId]) {
    let unique: HashSet<&NodeId> = order.iter().collect();
    assert_eq!(unique.len(), order.len(), "Traversal repeats a vertex: {order:?}");
    for id in order {
        assert!(pipeline.node(*id).is_some(), "Traversal lists unknown vertex {id}");
    }
}
