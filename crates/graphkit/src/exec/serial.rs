//! Single-threaded, deterministic executor.

use crate::cloud::CloudClient;
use crate::exec::action::{Action, ActionError};
use crate::exec::trace::{TraceEntry, TraceOutcome};
use crate::exec::{
    ActionWithError, ErrorStrategy, ExecError, ExecResult, ExecutorConfig, finish, signal_pending,
};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs actions one at a time.
///
/// When several actions are runnable, ties break by stable insertion order,
/// so runs are deterministic. Unresolvable dependencies are detected directly:
/// if nothing is runnable and actions remain, they are returned as pending.
pub struct SerialExecutor {
    config: ExecutorConfig,
    cloud: Arc<dyn CloudClient>,
    pending: Vec<Arc<dyn Action>>,
}

impl SerialExecutor {
    pub fn new(
        cloud: Arc<dyn CloudClient>,
        actions: Vec<Arc<dyn Action>>,
        config: ExecutorConfig,
    ) -> Result<SerialExecutor, ExecError> {
        config.validate()?;
        Ok(SerialExecutor {
            config,
            cloud,
            pending: actions,
        })
    }

    /// Drive every action to completion or pending.
    ///
    /// The configured timeout bounds the whole run; once it expires, the
    /// in-flight action and every subsequent one fail with
    /// [`ActionError::DeadlineExceeded`] and the error strategy applies.
    pub async fn run(mut self, cancel: &CancellationToken) -> Result<ExecResult, ExecError> {
        let deadline = tokio::time::Instant::now() + self.config.timeout;
        let mut pending = std::mem::take(&mut self.pending);
        let mut result = ExecResult::default();

        loop {
            let Some(pos) = pending.iter().position(|a| a.can_run()) else {
                // Nothing runnable: done if pending is empty, otherwise a
                // deadlock (cycle or cascading block) reported via pending.
                break;
            };
            let action = pending.remove(pos);
            log::debug!("run action {}", action.metadata());

            let started = Instant::now();
            let run_result = if self.config.dry_run {
                Ok(action.emits())
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ActionError::Cancelled),
                    _ = tokio::time::sleep_until(deadline) => Err(ActionError::DeadlineExceeded),
                    result = action.run(self.cloud.as_ref()) => result,
                }
            };
            let duration = started.elapsed();

            match run_result {
                Ok(events) => {
                    let signaled = signal_pending(&events, &pending);
                    let outcome = if self.config.dry_run {
                        TraceOutcome::DryRun
                    } else {
                        TraceOutcome::Success
                    };
                    self.config
                        .trace(TraceEntry::new(action.as_ref(), outcome, duration, signaled));
                    result.completed.push(action);
                }
                Err(error) => {
                    log::info!(
                        "action {} failed ({}): {error}",
                        action.metadata(),
                        self.config.error_strategy
                    );
                    self.config.trace(TraceEntry::new(
                        action.as_ref(),
                        TraceOutcome::Error(error.to_string()),
                        duration,
                        Vec::new(),
                    ));
                    result.errors.push(ActionWithError { action, error });
                    if self.config.error_strategy == ErrorStrategy::StopOnError {
                        break;
                    }
                }
            }
        }

        result.pending = pending;
        finish(&self.config, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::MockCloud;
    use crate::exec::testutil::{actions_from_graph, delayed_action, names};
    use crate::exec::{Event, GraphvizTracer};
    use std::time::Duration;

    fn executor(graph: &str, config: ExecutorConfig) -> SerialExecutor {
        SerialExecutor::new(Arc::new(MockCloud::new()), actions_from_graph(graph), config).unwrap()
    }

    async fn run(graph: &str, config: ExecutorConfig) -> (ExecResult, bool) {
        match executor(graph, config).run(&CancellationToken::new()).await {
            Ok(result) => (result, false),
            Err(err) => (err.into_result().unwrap(), true),
        }
    }

    #[tokio::test]
    async fn test_graphs() {
        struct Case {
            name: &'static str,
            graph: &'static str,
            pending: &'static [&'static str],
            errors: &'static [&'static str],
            want_err: bool,
        }
        let cases = [
            Case {
                name: "empty graph",
                graph: "",
                pending: &[],
                errors: &[],
                want_err: false,
            },
            Case {
                name: "one action",
                graph: "A",
                pending: &[],
                errors: &[],
                want_err: false,
            },
            Case {
                name: "action and dependency",
                graph: "A -> B",
                pending: &[],
                errors: &[],
                want_err: false,
            },
            Case {
                name: "chain of 3 actions",
                graph: "A -> B -> C",
                pending: &[],
                errors: &[],
                want_err: false,
            },
            Case {
                name: "two chains with common root",
                graph: "A -> B -> C; A -> C",
                pending: &[],
                errors: &[],
                want_err: false,
            },
            Case {
                name: "two node cycle",
                graph: "A -> B -> A",
                pending: &["A", "B"],
                errors: &[],
                want_err: true,
            },
            Case {
                name: "lot of children",
                graph: "A -> B; A -> C; A -> D -> B; A -> E -> F; A -> G",
                pending: &[],
                errors: &[],
                want_err: false,
            },
            Case {
                name: "complex fan in",
                graph: "A -> Z; B -> Z; C -> D -> B",
                pending: &[],
                errors: &[],
                want_err: false,
            },
            Case {
                name: "cycle in larger graph",
                graph: "A -> B -> C -> D -> C; X -> Y",
                pending: &["C", "D"],
                errors: &[],
                want_err: true,
            },
            Case {
                name: "error in action",
                graph: "A -> B -> !C -> D",
                pending: &["D"],
                errors: &["C"],
                want_err: true,
            },
        ];

        for dry_run in [false, true] {
            for case in &cases {
                if dry_run && (case.want_err || !case.errors.is_empty()) {
                    // Dry runs assume no errors happen.
                    continue;
                }
                let config = ExecutorConfig {
                    dry_run,
                    error_strategy: ErrorStrategy::StopOnError,
                    ..Default::default()
                };
                let (result, got_err) = run(case.graph, config).await;
                assert_eq!(got_err, case.want_err, "{} (dry_run={dry_run})", case.name);
                assert_eq!(
                    names(&result.pending),
                    case.pending,
                    "{} (dry_run={dry_run}): pending",
                    case.name
                );
                let error_names: Vec<String> = {
                    let mut v: Vec<String> = result
                        .errors
                        .iter()
                        .map(|e| e.action.metadata().name.clone())
                        .collect();
                    v.sort();
                    v
                };
                assert_eq!(
                    error_names, case.errors,
                    "{} (dry_run={dry_run}): errors",
                    case.name
                );
            }
        }
    }

    #[tokio::test]
    async fn test_chain_completes_in_order() {
        let (result, _) = run("A -> B -> C", ExecutorConfig::default()).await;
        let order: Vec<&str> = result
            .completed
            .iter()
            .map(|a| a.metadata().name.as_str())
            .collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_error_strategies() {
        // Stop on error: everything downstream of the failure stays pending.
        let config = ExecutorConfig {
            error_strategy: ErrorStrategy::StopOnError,
            ..Default::default()
        };
        let (result, got_err) = run("A -> !B -> C -> D -> E", config).await;
        assert!(got_err);
        assert_eq!(names(&result.completed), vec!["A"]);
        assert_eq!(names(&result.pending), vec!["C", "D", "E"]);
        assert_eq!(result.errors.len(), 1);

        // Continue on error: independent branches proceed, the blocked chain
        // stays pending.
        let config = ExecutorConfig {
            error_strategy: ErrorStrategy::ContinueOnError,
            ..Default::default()
        };
        let (result, got_err) = run("A -> !B -> C; A -> D; A -> E; A -> F", config).await;
        assert!(got_err);
        assert_eq!(names(&result.completed), vec!["A", "D", "E", "F"]);
        assert_eq!(names(&result.pending), vec!["C"]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].action.metadata().name, "B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_running_action() {
        let a = delayed_action("A", Vec::new(), vec![Event::str("A")], Duration::ZERO);
        let b = delayed_action(
            "B",
            vec![Event::str("A")],
            vec![Event::str("B")],
            Duration::from_secs(30),
        );
        let config = ExecutorConfig {
            timeout: Duration::from_millis(1),
            ..Default::default()
        };
        let ex = SerialExecutor::new(Arc::new(MockCloud::new()), vec![a, b], config).unwrap();
        let err = ex.run(&CancellationToken::new()).await.unwrap_err();
        let result = err.into_result().unwrap();
        assert_eq!(names(&result.completed), vec!["A"]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].action.metadata().name, "B");
        assert!(matches!(
            result.errors[0].error,
            ActionError::DeadlineExceeded
        ));
        assert!(result.pending.is_empty());
    }

    #[tokio::test]
    async fn test_caller_cancellation_observed() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ex = executor("A -> B", ExecutorConfig::default());
        let err = ex.run(&cancel).await.unwrap_err();
        let result = err.into_result().unwrap();
        assert!(result.completed.is_empty());
        assert!(matches!(result.errors[0].error, ActionError::Cancelled));
    }

    #[tokio::test]
    async fn test_tracer_records_outcomes() {
        let tracer = Arc::new(GraphvizTracer::new());
        let config = ExecutorConfig {
            error_strategy: ErrorStrategy::StopOnError,
            tracer: Some(tracer.clone()),
            ..Default::default()
        };
        let ex = executor("A -> !B -> C", config);
        let _ = ex.run(&CancellationToken::new()).await;

        let entries = tracer.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].outcome, TraceOutcome::Success);
        assert!(matches!(entries[1].outcome, TraceOutcome::Error(_)));
        assert_eq!(entries[2].outcome, TraceOutcome::Pending);
        let dot = tracer.to_dot();
        assert!(dot.contains("-> n1"));
    }
}
