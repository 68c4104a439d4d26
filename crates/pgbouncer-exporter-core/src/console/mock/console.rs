//! Scripted admin console.
//!
//! `MockConsole` answers `SHOW` queries from an in-memory script, so collector
//! and scrape logic can be tested on any machine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::console::{AdminConsole, ConsoleError, ConsoleRow};

#[derive(Debug, Clone)]
enum Response {
    Rows(Vec<ConsoleRow>),
    Fail(ConsoleError),
}

#[derive(Debug, Default)]
struct Script {
    responses: HashMap<String, Response>,
    calls: Vec<String>,
    close_error: Option<ConsoleError>,
    close_calls: usize,
}

#[derive(Debug, Default)]
struct Shared {
    script: Mutex<Script>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Scripted console.
///
/// Clones share the same script and counters, so a test can keep one handle
/// while the collector owns another.
#[derive(Debug, Clone, Default)]
pub struct MockConsole {
    shared: Arc<Shared>,
    delay: Duration,
}

impl MockConsole {
    /// Creates a console that answers every query with zero rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every query take at least `delay`.
    ///
    /// The delay is spent outside the script lock, so overlapping callers are
    /// visible in [`max_concurrent_queries`](Self::max_concurrent_queries).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Scripts the rows returned for `query`.
    pub fn set_rows(&self, query: &str, rows: Vec<ConsoleRow>) {
        self.script()
            .responses
            .insert(query.to_string(), Response::Rows(rows));
    }

    /// Scripts `query` to fail with `error`.
    pub fn fail(&self, query: &str, error: ConsoleError) {
        self.script()
            .responses
            .insert(query.to_string(), Response::Fail(error));
    }

    /// Makes `close()` fail with `error`.
    pub fn fail_close(&self, error: ConsoleError) {
        self.script().close_error = Some(error);
    }

    /// All queries received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }

    /// Number of `close()` calls received.
    pub fn close_calls(&self) -> usize {
        self.script().close_calls
    }

    /// Highest number of queries that were executing at the same time.
    pub fn max_concurrent_queries(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.shared
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl AdminConsole for MockConsole {
    fn query(&mut self, query: &str) -> Result<Vec<ConsoleRow>, ConsoleError> {
        let running = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared
            .max_in_flight
            .fetch_max(running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let response = {
            let mut script = self.script();
            script.calls.push(query.to_string());
            script.responses.get(query).cloned()
        };

        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);

        match response {
            Some(Response::Rows(rows)) => Ok(rows),
            Some(Response::Fail(error)) => Err(error),
            None => Ok(Vec::new()),
        }
    }

    fn close(&mut self) -> Result<(), ConsoleError> {
        let mut script = self.script();
        script.close_calls += 1;
        match script.close_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
