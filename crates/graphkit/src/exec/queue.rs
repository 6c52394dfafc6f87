//! Bounded fan-out worker pool with orphan drainage.
//!
//! Tasks are spawned one worker each, optionally gated by a semaphore. When
//! [`ParallelQueue::run`] exits early — cancellation or a worker error —
//! in-flight workers keep running as orphans; [`ParallelQueue::wait_for_orphans`]
//! blocks until they return and takes its own cancellation scope, so cleanup
//! is bounded independently of the deadline that ended the run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Queued plus running task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    queued: usize,
    running: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AddError {
    /// The queue no longer accepts work: its run has finished or is
    /// shutting down.
    #[error("queue is closed")]
    Closed,
}

/// Failure mode of [`ParallelQueue::run`].
#[derive(Debug, Error)]
pub enum RunError<E> {
    #[error("queue is already running")]
    AlreadyRunning,
    #[error("queue run cancelled")]
    Cancelled,
    /// A worker returned an error; dispatch stopped.
    #[error("worker error")]
    Worker(E),
}

/// Failure mode of [`ParallelQueue::wait_for_orphans`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("cancelled while waiting for orphans")]
    Cancelled,
}

/// A worker pool generic over its task type.
#[derive(Debug)]
pub struct ParallelQueue<T> {
    tx: mpsc::UnboundedSender<T>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<T>>>,
    counts: watch::Sender<Counts>,
    closed: AtomicBool,
    limit: Option<usize>,
}

impl<T: Send + 'static> ParallelQueue<T> {
    /// Unbounded fan-out: one worker per task.
    pub fn new() -> ParallelQueue<T> {
        ParallelQueue::with_limit(None)
    }

    /// At most `limit` workers run concurrently.
    pub fn bounded(limit: usize) -> ParallelQueue<T> {
        ParallelQueue::with_limit(Some(limit))
    }

    fn with_limit(limit: Option<usize>) -> ParallelQueue<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        ParallelQueue {
            tx,
            rx: Mutex::new(Some(rx)),
            counts: watch::Sender::new(Counts::default()),
            closed: AtomicBool::new(false),
            limit,
        }
    }

    /// Enqueue a task. Fails once the queue has shut down.
    pub fn add(&self, task: T) -> Result<(), AddError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AddError::Closed);
        }
        self.counts.send_modify(|c| c.queued += 1);
        if self.tx.send(task).is_err() {
            self.counts.send_modify(|c| c.queued -= 1);
            return Err(AddError::Closed);
        }
        Ok(())
    }

    /// Dispatch tasks to `worker` until the queue drains, the token is
    /// cancelled, or a worker returns an error.
    ///
    /// Drain means no tasks queued and no workers in flight; workers may add
    /// follow-up tasks before they return. On early exit, in-flight workers
    /// become orphans and the queue stops accepting work.
    pub async fn run<W, Fut, E>(&self, cancel: CancellationToken, worker: W) -> Result<(), RunError<E>>
    where
        W: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        let mut rx = match self.rx.lock().unwrap().take() {
            Some(rx) => rx,
            None => return Err(RunError::AlreadyRunning),
        };

        let worker = Arc::new(worker);
        let semaphore = self.limit.map(|n| Arc::new(Semaphore::new(n)));
        let (err_tx, mut err_rx) = mpsc::unbounded_channel::<E>();
        let mut counts_rx = self.counts.subscribe();

        let result = loop {
            while let Ok(task) = rx.try_recv() {
                self.spawn_worker(task, worker.clone(), semaphore.clone(), err_tx.clone());
            }
            if *self.counts.borrow() == Counts::default() {
                break Ok(());
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Err(RunError::Cancelled),
                Some(err) = err_rx.recv() => break Err(RunError::Worker(err)),
                task = rx.recv() => match task {
                    Some(task) => {
                        self.spawn_worker(task, worker.clone(), semaphore.clone(), err_tx.clone());
                    }
                    None => break Ok(()),
                },
                _ = counts_rx.changed() => {}
            }
        };

        self.closed.store(true, Ordering::Release);
        result
    }

    fn spawn_worker<W, Fut, E>(
        &self,
        task: T,
        worker: Arc<W>,
        semaphore: Option<Arc<Semaphore>>,
        err_tx: mpsc::UnboundedSender<E>,
    ) where
        W: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        self.counts.send_modify(|c| {
            c.queued -= 1;
            c.running += 1;
        });
        let counts = self.counts.clone();
        tokio::spawn(async move {
            let _permit = match &semaphore {
                Some(s) => s.clone().acquire_owned().await.ok(),
                None => None,
            };
            if let Err(err) = worker(task).await {
                let _ = err_tx.send(err);
            }
            counts.send_modify(|c| c.running -= 1);
        });
    }

    /// Block until every in-flight worker has returned.
    ///
    /// Takes a separately scoped token on purpose: the caller bounds cleanup
    /// independently of whatever deadline ended the run.
    pub async fn wait_for_orphans(&self, cancel: &CancellationToken) -> Result<(), WaitError> {
        let mut counts_rx = self.counts.subscribe();
        loop {
            if counts_rx.borrow_and_update().running == 0 {
                return Ok(());
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(WaitError::Cancelled),
                changed = counts_rx.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// In-flight worker count, for introspection.
    pub fn running(&self) -> usize {
        self.counts.borrow().running
    }
}

impl<T: Send + 'static> Default for ParallelQueue<T> {
    fn default() -> Self {
        ParallelQueue::new()
    }
}
