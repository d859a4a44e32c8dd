//! In-memory command runner for testing collectors without fabric access.
//!
//! `MockRunner` maps full command lines (`"perfquery -l -x -G 0x... 1,2"`)
//! to canned responses, optionally delays every call, and records the peak
//! number of calls in flight so tests can assert concurrency limits.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::collector::traits::{CommandRunner, RunError};

/// Canned outcome of one command line.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Successful run with this stdout.
    Output(String),
    /// Non-zero exit with this stderr.
    Failure(String),
    /// Deadline exceeded.
    Timeout,
}

/// Command runner that replays canned responses.
#[derive(Debug, Default)]
pub struct MockRunner {
    responses: HashMap<String, MockResponse>,
    /// Used for command lines without an explicit response.
    fallback: Option<MockResponse>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers stdout for a command line.
    pub fn with_output(mut self, command_line: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.responses
            .insert(command_line.into(), MockResponse::Output(stdout.into()));
        self
    }

    /// Registers a failed run for a command line.
    pub fn with_failure(mut self, command_line: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.responses
            .insert(command_line.into(), MockResponse::Failure(stderr.into()));
        self
    }

    /// Registers a timed out run for a command line.
    pub fn with_timeout(mut self, command_line: impl Into<String>) -> Self {
        self.responses.insert(command_line.into(), MockResponse::Timeout);
        self
    }

    /// Response for every command line not registered explicitly.
    pub fn with_fallback(mut self, response: MockResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Makes every call take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Command lines received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Highest number of calls observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, command_line: &str, timeout: Duration) -> Result<String, RunError> {
        let response = self
            .responses
            .get(command_line)
            .or(self.fallback.as_ref());
        match response {
            Some(MockResponse::Output(out)) => Ok(out.clone()),
            Some(MockResponse::Failure(stderr)) => Err(RunError::Exit {
                status: Some(1),
                stderr: stderr.clone(),
            }),
            Some(MockResponse::Timeout) => Err(RunError::Timeout(timeout)),
            None => Err(RunError::Spawn(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no mock response for: {}", command_line),
            ))),
        }
    }
}

/// Decrements the in-flight counter when a call finishes.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CommandRunner for MockRunner {
    async fn run(
        &self,
        command: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, RunError> {
        let mut command_line = command.to_string();
        for arg in args {
            command_line.push(' ');
            command_line.push_str(arg);
        }
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command_line.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.respond(&command_line, timeout)
    }
}
