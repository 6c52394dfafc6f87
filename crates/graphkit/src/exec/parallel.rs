//! Multi-threaded executor over the parallel queue.
//!
//! Runnable actions are moved from the pending set into the queue; each
//! worker runs its action, records the outcome, delivers emitted events, and
//! re-queues whatever became runnable. Shared state lives behind one mutex,
//! held only for O(pending) bookkeeping, never across a suspension point.
//!
//! Cycle detection is indirect: when nothing is runnable and no worker is
//! active, the queue drains and whatever is left in the pending set is
//! reported through the pending-actions sentinel.

use crate::cloud::CloudClient;
use crate::exec::action::{Action, ActionError};
use crate::exec::trace::{TraceEntry, TraceOutcome};
use crate::exec::{
    ActionWithError, ErrorStrategy, ExecError, ExecResult, ExecutorConfig, ParallelQueue, finish,
    signal_pending,
};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Marker error a worker returns to stop dispatch under
/// [`ErrorStrategy::StopOnError`].
#[derive(Debug)]
struct Stop;

/// Runs independent actions concurrently.
pub struct ParallelExecutor {
    config: ExecutorConfig,
    cloud: Arc<dyn CloudClient>,
    state: Mutex<ExecResult>,
    queue: ParallelQueue<Arc<dyn Action>>,
}

impl ParallelExecutor {
    pub fn new(
        cloud: Arc<dyn CloudClient>,
        actions: Vec<Arc<dyn Action>>,
        config: ExecutorConfig,
    ) -> Result<ParallelExecutor, ExecError> {
        config.validate()?;
        let queue = match config.max_workers {
            Some(limit) => ParallelQueue::bounded(limit),
            None => ParallelQueue::new(),
        };
        Ok(ParallelExecutor {
            config,
            cloud,
            state: Mutex::new(ExecResult {
                pending: actions,
                ..Default::default()
            }),
            queue,
        })
    }

    /// Execute pending actions in parallel.
    ///
    /// The configured timeout bounds the work phase; cancellation of the
    /// caller token propagates to every in-flight action. After an early
    /// exit, in-flight workers are drained under the separately scoped
    /// wait-for-orphans timeout so cleanup is not truncated by the deadline
    /// that triggered it.
    pub async fn run(self, cancel: &CancellationToken) -> Result<ExecResult, ExecError> {
        let ex = Arc::new(self);
        let work = cancel.child_token();
        let timer = tokio::spawn({
            let work = work.clone();
            let timeout = ex.config.timeout;
            async move {
                tokio::time::sleep(timeout).await;
                work.cancel();
            }
        });

        ex.queue_runnable_actions();
        let worker = {
            let ex = ex.clone();
            let work = work.clone();
            move |action: Arc<dyn Action>| {
                let ex = ex.clone();
                let work = work.clone();
                async move { ex.run_action(work, action).await }
            }
        };
        let run_result = ex.queue.run(work.clone(), worker).await;
        timer.abort();
        // The work phase is over; anything still in flight must observe
        // cancellation and wind down.
        work.cancel();

        if run_result.is_err() {
            let drain = cancel.child_token();
            let drained = tokio::time::timeout(
                ex.config.wait_for_orphans_timeout,
                ex.queue.wait_for_orphans(&drain),
            )
            .await;
            if !matches!(drained, Ok(Ok(()))) {
                log::warn!("parallel executor: orphan drain did not finish");
                let result = ex.take_result();
                return Err(ExecError::OrphanDrain { result });
            }
        }

        let result = ex.take_result();
        finish(&ex.config, result)
    }

    async fn run_action(
        self: Arc<Self>,
        work: CancellationToken,
        action: Arc<dyn Action>,
    ) -> Result<(), Stop> {
        log::debug!("run action {}", action.metadata());
        let started = Instant::now();
        let run_result = if self.config.dry_run {
            Ok(action.emits())
        } else {
            tokio::select! {
                biased;
                _ = work.cancelled() => Err(ActionError::Cancelled),
                result = action.run(self.cloud.as_ref()) => result,
            }
        };
        let duration = started.elapsed();
        log::debug!("finish action {}", action.metadata());

        match run_result {
            Ok(events) => {
                // Notify dependents only when the action succeeded.
                let signaled = {
                    let mut state = self.state.lock().unwrap();
                    state.completed.push(action.clone());
                    signal_pending(&events, &state.pending)
                };
                let outcome = if self.config.dry_run {
                    TraceOutcome::DryRun
                } else {
                    TraceOutcome::Success
                };
                self.config
                    .trace(TraceEntry::new(action.as_ref(), outcome, duration, signaled));
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
                let stop = self.config.error_strategy == ErrorStrategy::StopOnError;
                self.state
                    .lock()
                    .unwrap()
                    .errors
                    .push(ActionWithError { action, error });
                if stop {
                    return Err(Stop);
                }
            }
        }

        self.queue_runnable_actions();
        Ok(())
    }

    /// Move every runnable action from the pending set into the queue.
    /// Never blocks; holds the lock only for the scan.
    fn queue_runnable_actions(&self) {
        let mut state = self.state.lock().unwrap();
        log::debug!(
            "queue_runnable_actions: {} actions pending",
            state.pending.len()
        );
        let mut not_runnable = Vec::with_capacity(state.pending.len());
        for action in std::mem::take(&mut state.pending) {
            if action.can_run() {
                if let Err(err) = self.queue.add(action.clone()) {
                    log::debug!("{} not queued: {err}", action.metadata());
                    not_runnable.push(action);
                }
            } else {
                not_runnable.push(action);
            }
        }
        state.pending = not_runnable;
    }

    fn take_result(&self) -> ExecResult {
        std::mem::take(&mut *self.state.lock().unwrap())
    }
}
