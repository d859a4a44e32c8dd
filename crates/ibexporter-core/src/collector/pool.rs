//! Bounded fan-out of tool invocations over a device list.
//!
//! One collection pass spawns a task per device. Every external call made by
//! those tasks goes through a shared [`Dispatcher`], whose semaphore caps the
//! number of calls in flight across the whole pass. Results and error/timeout
//! counts land in a lock-protected [`PassSink`]; the pass returns only after
//! every task has finished.

use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::collector::invocation::Invocation;
use crate::collector::traits::{CommandRunner, RunError};
use crate::model::Device;

/// Aggregated result of one collection pass.
#[derive(Debug)]
pub struct CollectOutcome<T> {
    /// Successful records, in no particular order.
    pub records: Vec<T>,
    pub errors: u64,
    pub timeouts: u64,
    pub duration: Duration,
}

impl<T> Default for CollectOutcome<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            errors: 0,
            timeouts: 0,
            duration: Duration::ZERO,
        }
    }
}

impl<T> CollectOutcome<T> {
    pub fn stats(&self, collector: &str) -> CollectorStats {
        CollectorStats {
            collector: collector.to_string(),
            duration: self.duration.as_secs_f64(),
            errors: self.errors,
            timeouts: self.timeouts,
        }
    }
}

/// Per-collector summary reported alongside the records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectorStats {
    pub collector: String,
    /// Wall-clock seconds of the whole pass.
    pub duration: f64,
    pub errors: u64,
    pub timeouts: u64,
}

/// Runs invocations through a runner, at most `max_concurrent` at a time,
/// each with its own deadline.
pub struct Dispatcher<R> {
    runner: Arc<R>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl<R> Clone for Dispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            runner: self.runner.clone(),
            permits: self.permits.clone(),
            timeout: self.timeout,
        }
    }
}

impl<R: CommandRunner> Dispatcher<R> {
    /// A limit of 0 is treated as 1.
    pub fn new(runner: Arc<R>, max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            runner,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs one invocation once a slot is free.
    pub async fn invoke(&self, invocation: &Invocation) -> Result<String, RunError> {
        self.invoke_timed(invocation).await.0
    }

    /// Like [`invoke`](Self::invoke), also returning the time spent running
    /// (waiting for a slot excluded).
    pub async fn invoke_timed(&self, invocation: &Invocation) -> (Result<String, RunError>, Duration) {
        // The permit is released on drop, including when the call fails.
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return (
                    Err(RunError::Spawn(io::Error::other(e.to_string()))),
                    Duration::ZERO,
                );
            }
        };
        debug!(command = %invocation, "running");
        let start = Instant::now();
        let result = self
            .runner
            .run(&invocation.command, &invocation.args, self.timeout)
            .await;
        (result, start.elapsed())
    }
}

/// Shared accumulator of one pass.
pub struct PassSink<T> {
    inner: Arc<Mutex<CollectOutcome<T>>>,
}

impl<T> Clone for PassSink<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PassSink<T> {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CollectOutcome::default())),
        }
    }

    fn with<F: FnOnce(&mut CollectOutcome<T>)>(&self, f: F) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    pub fn push(&self, record: T) {
        self.with(|outcome| outcome.records.push(record));
    }

    pub fn extend(&self, records: impl IntoIterator<Item = T>) {
        self.with(|outcome| outcome.records.extend(records));
    }

    /// Adds parser-level or field-level errors.
    pub fn add_errors(&self, count: u64) {
        if count > 0 {
            self.with(|outcome| outcome.errors += count);
        }
    }

    /// Counts a failed invocation as a timeout or an error.
    pub fn record_failure(&self, err: &RunError) {
        self.with(|outcome| {
            if err.is_timeout() {
                outcome.timeouts += 1;
            } else {
                outcome.errors += 1;
            }
        });
    }

    fn take(&self) -> CollectOutcome<T> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    }
}

/// Spawns `work` once per device and waits for all of them.
///
/// A task that panics is counted as one error; the other tasks are unaffected.
pub async fn fan_out<T, F, Fut>(collector: &str, devices: &[Arc<Device>], work: F) -> CollectOutcome<T>
where
    T: Send + 'static,
    F: Fn(Arc<Device>, PassSink<T>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let start = Instant::now();
    let sink = PassSink::new();
    debug!(collector, count = devices.len(), "collecting on devices");

    let mut tasks = JoinSet::new();
    for device in devices {
        tasks.spawn(work(device.clone(), sink.clone()));
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(collector, error = %e, "collection task failed");
            sink.add_errors(1);
        }
    }

    let mut outcome = sink.take();
    outcome.duration = start.elapsed();
    debug!(
        collector,
        records = outcome.records.len(),
        errors = outcome.errors,
        timeouts = outcome.timeouts,
        "pass complete"
    );
    outcome
}
