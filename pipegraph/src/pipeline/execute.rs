//! Sequential run loop.

use std::time::Instant;

use tracing::{error, info};

use super::Pipeline;
use crate::errors::{PipegraphError, Result};
use crate::nodes::NodeId;
use crate::plugins::RunArgs;

fn millis(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl Pipeline {
    /// Runs every plugin reachable from `start`, one at a time.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run_with`].
    pub async fn run(&mut self, start: Option<NodeId>) -> Result<()> {
        self.run_with(start, &RunArgs::new()).await
    }

    /// Runs every plugin reachable from `start` with the given arguments.
    ///
    /// The pipeline is materialized if needed, then each plugin reachable
    /// from `start` runs in breadth-first order. The first failing step stops
    /// the run.
    ///
    /// # Errors
    ///
    /// - staging errors (`StagingIo`, `Persistence`)
    /// - traversal errors (`AmbiguousStart`, `InvalidStart`)
    /// - `StepExecution` for the first step that fails
    pub async fn run_with(&mut self, start: Option<NodeId>, args: &RunArgs) -> Result<()> {
        self.materialize()?;
        let order = self.traverse(start, true)?;

        let started = Instant::now();
        info!(pipeline_id = %self.id, steps = order.len(), "Executing workflow");

        for (position, id) in order.iter().enumerate() {
            let Some(node) = self.graph.plugin(*id) else {
                continue;
            };
            let step_started = Instant::now();
            info!(step = %node.name(), node_id = %id, position, "Step started");

            if let Err(source) = node.plugin().run(args).await {
                error!(step = %node.name(), node_id = %id, error = %source, "Step failed");
                return Err(PipegraphError::StepExecution {
                    step: node.name().to_string(),
                    id: *id,
                    source,
                });
            }

            info!(
                step = %node.name(),
                duration_ms = millis(step_started),
                "Step completed"
            );
        }

        info!(
            pipeline_id = %self.id,
            duration_ms = millis(started),
            "Workflow completed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::testing::{failing_step, recording_step, ExecutionLog};
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_run_passes_args_and_locations() {
        let log = ExecutionLog::new();
        let mut x = recording_step("x", &["inpDir"], &["outDir"], &log);
        x.bind("inpDir", PathBuf::from("/data")).unwrap();

        let mut pipeline = Pipeline::builder()
            .plugin(x)
            .staging_root("/wf")
            .storage(Arc::new(MemoryStorage::new()))
            .build()
            .unwrap();

        let mut args = RunArgs::new();
        args.insert("dryRun".to_string(), json!(true));
        pipeline.run_with(None, &args).await.unwrap();

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].args.get("dryRun"), Some(&json!(true)));
        assert_eq!(records[0].values.get("inpDir"), Some(&json!("/data")));
        assert!(records[0].values.contains_key("outDir"));
        assert!(records[0].storage_attached);
        assert!(pipeline.is_materialized());
    }

    #[test]
    fn test_millis_reports_elapsed_time() {
        let Some(earlier) = Instant::now().checked_sub(std::time::Duration::from_millis(1500))
        else {
            return;
        };
        assert!(millis(earlier) >= 1500);
    }

    #[tokio::test]
    async fn test_failure_stops_run() {
        let log = ExecutionLog::new();
        let mut x = failing_step("x", &["inpDir"], &["outDir"], "boom", &log);
        let mut y = recording_step("y", &["inpDir"], &["outDir"], &log);
        x.bind("inpDir", PathBuf::from("/data")).unwrap();
        y.bind("inpDir", x.binding("outDir").unwrap().clone()).unwrap();
        let xid = x.id();

        let mut pipeline = Pipeline::builder()
            .plugin(x)
            .plugin(y)
            .staging_root("/wf")
            .storage(Arc::new(MemoryStorage::new()))
            .build()
            .unwrap();

        let err = pipeline.run(None).await.unwrap_err();
        match err {
            PipegraphError::StepExecution { step, id, source } => {
                assert_eq!(step, "x");
                assert_eq!(id, xid);
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("expected StepExecution, got {other:?}"),
        }
        assert_eq!(log.steps(), vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_ambiguous_start_runs_nothing() {
        let log = ExecutionLog::new();
        let mut merge = recording_step("merge", &["a", "b"], &["outDir"], &log);
        merge.bind("a", PathBuf::from("/a")).unwrap();
        merge.bind("b", PathBuf::from("/b")).unwrap();

        let storage = MemoryStorage::new();
        let mut pipeline = Pipeline::builder()
            .plugin(merge)
            .staging_root("/wf")
            .storage(Arc::new(storage.clone()))
            .build()
            .unwrap();

        let err = pipeline.run(None).await.unwrap_err();
        assert!(matches!(err, PipegraphError::AmbiguousStart { roots: 2 }));
        assert!(pipeline.is_materialized());
        assert!(log.is_empty());

        let a = pipeline.roots()[0];
        pipeline.run(Some(a)).await.unwrap();
        assert_eq!(log.steps(), vec!["merge".to_string()]);
        assert!(storage.create_dir_calls() > 0);
    }
}
