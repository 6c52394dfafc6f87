//! Executors: drive a planned action set to completion.
//!
//! Two interchangeable runners share one configuration and result shape. The
//! serial executor is deterministic and single-threaded; the parallel
//! executor fans out over a worker queue. Both deliver emitted events to
//! pending actions and surface unresolvable dependencies (cycles, cascading
//! blocks) as pending actions behind the [`ExecError::PendingActions`]
//! sentinel.

pub mod action;
pub mod event;
pub mod parallel;
pub mod queue;
pub mod serial;
pub mod trace;

#[cfg(test)]
pub(crate) mod testutil;

pub use action::{Action, ActionError, ActionKind, ActionMetadata, EventWaiter};
pub use event::Event;
pub use parallel::ParallelExecutor;
pub use queue::{AddError, ParallelQueue, RunError, WaitError};
pub use serial::SerialExecutor;
pub use trace::{GraphvizTracer, TraceEntry, TraceOutcome, TraceSignal, Tracer};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// What to do when an action fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorStrategy {
    /// Stop dispatching new actions after the first failure.
    StopOnError,
    /// Keep running branches unaffected by the failure.
    #[default]
    ContinueOnError,
}

impl fmt::Display for ErrorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorStrategy::StopOnError => write!(f, "stop-on-error"),
            ErrorStrategy::ContinueOnError => write!(f, "continue-on-error"),
        }
    }
}

/// Shared executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Skip `run` and record a synthetic success emitting the declared
    /// events.
    pub dry_run: bool,
    pub error_strategy: ErrorStrategy,
    /// Bounds the work phase.
    pub timeout: Duration,
    /// Bounds post-error cleanup, separately from `timeout`.
    pub wait_for_orphans_timeout: Duration,
    /// Concurrent worker bound for the parallel executor. `None` means one
    /// worker per runnable action.
    pub max_workers: Option<usize>,
    pub tracer: Option<Arc<dyn Tracer>>,
}

impl Default for ExecutorConfig {
    fn default() -> ExecutorConfig {
        ExecutorConfig {
            dry_run: false,
            error_strategy: ErrorStrategy::default(),
            timeout: Duration::from_secs(5 * 60),
            wait_for_orphans_timeout: Duration::from_secs(60),
            max_workers: None,
            tracer: None,
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.timeout.is_zero() {
            return Err(ExecError::InvalidConfig("timeout must be non-zero".into()));
        }
        if self.wait_for_orphans_timeout.is_zero() {
            return Err(ExecError::InvalidConfig(
                "wait-for-orphans timeout must be non-zero".into(),
            ));
        }
        if self.max_workers == Some(0) {
            return Err(ExecError::InvalidConfig("max workers must be non-zero".into()));
        }
        Ok(())
    }

    pub(crate) fn trace(&self, entry: TraceEntry) {
        if let Some(tracer) = &self.tracer {
            tracer.record(entry);
        }
    }
}

/// An action paired with the error that stopped it.
#[derive(Debug)]
pub struct ActionWithError {
    pub action: Arc<dyn Action>,
    pub error: ActionError,
}

/// Aggregate outcome of an executor run.
#[derive(Debug, Default)]
pub struct ExecResult {
    pub completed: Vec<Arc<dyn Action>>,
    pub errors: Vec<ActionWithError>,
    /// Actions that never became runnable: blocked on failed producers or
    /// part of a dependency cycle.
    pub pending: Vec<Arc<dyn Action>>,
}

impl ExecResult {
    /// True iff every action completed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.pending.is_empty()
    }
}

/// Executor failure.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The single sentinel for "the executor did not process all actions".
    /// Carries the partial result.
    #[error("executor did not process all actions")]
    PendingActions { result: ExecResult },
    /// Orphan drainage was cancelled or timed out; in-flight workers may
    /// still be running.
    #[error("waiting for orphans timed out")]
    OrphanDrain { result: ExecResult },
    #[error("invalid executor config: {0}")]
    InvalidConfig(String),
}

impl ExecError {
    /// The partial result, when the run produced one.
    pub fn into_result(self) -> Option<ExecResult> {
        match self {
            ExecError::PendingActions { result } | ExecError::OrphanDrain { result } => {
                Some(result)
            }
            ExecError::InvalidConfig(_) => None,
        }
    }
}

/// Deliver events to every pending action, returning the deliveries that
/// landed.
pub(crate) fn signal_pending(events: &[Event], pending: &[Arc<dyn Action>]) -> Vec<TraceSignal> {
    let mut signaled = Vec::new();
    for action in pending {
        for event in events {
            if action.signal(event) {
                signaled.push(TraceSignal {
                    event: event.clone(),
                    action: action.metadata().name.clone(),
                });
            }
        }
    }
    signaled
}

/// Wrap up a finished run: trace leftover pending actions and apply the
/// sentinel error contract.
pub(crate) fn finish(config: &ExecutorConfig, result: ExecResult) -> Result<ExecResult, ExecError> {
    for action in &result.pending {
        config.trace(TraceEntry::new(
            action.as_ref(),
            TraceOutcome::Pending,
            Duration::ZERO,
            Vec::new(),
        ));
    }
    if result.is_clean() {
        Ok(result)
    } else {
        Err(ExecError::PendingActions { result })
    }
}
