//! Collector: the surface the exposition layer talks to.
//!
//! Owns the console and runs at most one scrape cycle at a time. Concurrent
//! callers queue on the cycle lock and each gets a fresh cycle of their own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::console::{AdminConsole, ConsoleError, ConsoleRow};
use crate::extract::MetricSample;
use crate::registry::{MetricIdentity, MetricRegistry};
use crate::scrape::{FailurePolicy, HealthState, ScrapeOrchestrator};

/// Stands in for the console after [`Collector::close`].
struct ClosedConsole;

impl AdminConsole for ClosedConsole {
    fn query(&mut self, _query: &str) -> Result<Vec<ConsoleRow>, ConsoleError> {
        Err(ConsoleError::Closed)
    }

    fn close(&mut self) -> Result<(), ConsoleError> {
        Err(ConsoleError::Closed)
    }
}

struct ScrapeState {
    console: Box<dyn AdminConsole>,
    health: HealthState,
}

pub struct Collector {
    registry: MetricRegistry,
    policy: FailurePolicy,
    state: Mutex<ScrapeState>,
}

impl Collector {
    pub fn new(
        console: Box<dyn AdminConsole>,
        namespace: impl Into<String>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            registry: MetricRegistry::new(namespace),
            policy,
            state: Mutex::new(ScrapeState {
                console,
                health: HealthState::default(),
            }),
        }
    }

    /// Every identity this collector can emit. Performs no I/O.
    pub fn describe_all(&self) -> Vec<Arc<MetricIdentity>> {
        self.registry.identities().cloned().collect()
    }

    /// Runs one scrape cycle and returns its samples followed by the four
    /// health samples (up, errors, last scrape time, total scrapes).
    pub fn collect_once(&self) -> Vec<MetricSample> {
        let mut state = self.lock();
        let ScrapeState { console, health } = &mut *state;

        let orchestrator = ScrapeOrchestrator::new(&self.registry, self.policy);
        let (mut samples, result) = orchestrator.run_cycle(&mut **console, health);

        let internal = self.registry.internal();
        samples.reserve(4);
        for (identity, value) in [
            (&internal.up, health.up.as_value()),
            (&internal.errors, health.errors as f64),
            (&internal.scrape_last_time, health.last_scrape_time),
            (&internal.scrape_total, health.total_scrapes as f64),
        ] {
            samples.push(MetricSample {
                identity: Arc::clone(identity),
                value,
                labels: Vec::new(),
            });
        }

        debug!(
            samples = samples.len(),
            failed_topics = result.failed_topics,
            "collected"
        );
        samples
    }

    /// Health as of the most recent cycle.
    pub fn health(&self) -> HealthState {
        self.lock().health.clone()
    }

    /// Closes the console. Later cycles fail every topic; a second call
    /// returns [`ConsoleError::Closed`].
    pub fn close(&self) -> Result<(), ConsoleError> {
        let mut state = self.lock();
        let mut console = std::mem::replace(&mut state.console, Box::new(ClosedConsole));
        console.close()
    }

    fn lock(&self) -> MutexGuard<'_, ScrapeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("namespace", &self.registry.namespace())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::MockConsole;
    use crate::registry::Topic;
    use crate::scrape::Liveness;
    use std::collections::HashSet;
    use std::time::Duration;

    fn find<'a>(samples: &'a [MetricSample], name: &str) -> Vec<&'a MetricSample> {
        samples.iter().filter(|s| s.name() == name).collect()
    }

    #[test]
    fn describe_all_needs_no_console() {
        let console = MockConsole::new();
        let collector = Collector::new(
            Box::new(console.clone()),
            "pgbouncer",
            FailurePolicy::default(),
        );

        let identities = collector.describe_all();
        let names: HashSet<&str> = identities.iter().map(|m| m.name.as_str()).collect();

        assert_eq!(names.len(), identities.len());
        assert!(names.contains("pgbouncer_pools_cl_active"));
        assert!(names.contains("pgbouncer_up"));
        assert!(names.contains("pgbouncer_scrape_total"));
        assert!(console.calls().is_empty());
    }

    #[test]
    fn lists_key_value_scenario() {
        let console = MockConsole::new();
        console.set_rows(
            "SHOW LISTS;",
            vec![ConsoleRow::new().with("item", "pools").with("value", 4_i64)],
        );
        let collector = Collector::new(Box::new(console), "ns", FailurePolicy::default());

        let samples = collector.collect_once();

        let pools = find(&samples, "ns_lists_pools");
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].value, 4.0);
        assert!(pools[0].labels.is_empty());
    }

    #[test]
    fn pools_labeled_scenario() {
        let console = MockConsole::new();
        console.set_rows(
            "SHOW POOLS;",
            vec![
                ConsoleRow::new()
                    .with("database", "db1")
                    .with("user", "u1")
                    .with("pool_mode", "transaction")
                    .with("cl_active", 3_i64),
            ],
        );
        let collector = Collector::new(Box::new(console), "ns", FailurePolicy::default());

        let samples = collector.collect_once();

        let cl_active = find(&samples, "ns_pools_cl_active");
        assert_eq!(cl_active.len(), 1);
        assert_eq!(cl_active[0].value, 3.0);
        assert_eq!(cl_active[0].labels, vec!["db1", "u1", "transaction"]);
    }

    #[test]
    fn internal_samples_are_appended() {
        let collector = Collector::new(
            Box::new(MockConsole::typical_pgbouncer()),
            "pgbouncer",
            FailurePolicy::default(),
        );

        collector.collect_once();
        let samples = collector.collect_once();
        let tail: Vec<(&str, f64)> = samples[samples.len() - 4..]
            .iter()
            .map(|s| (s.name(), s.value))
            .collect();

        assert_eq!(tail[0], ("pgbouncer_up", 1.0));
        assert_eq!(tail[1], ("pgbouncer_errors", 0.0));
        assert_eq!(tail[2].0, "pgbouncer_scrape_last_time");
        assert!(tail[2].1 > 0.0);
        assert_eq!(tail[3], ("pgbouncer_scrape_total", 2.0));
    }

    #[test]
    fn unauthorized_console_is_down() {
        let collector = Collector::new(
            Box::new(MockConsole::unauthorized_pgbouncer()),
            "pgbouncer",
            FailurePolicy::default(),
        );

        let samples = collector.collect_once();

        assert_eq!(samples.len(), 4);
        assert_eq!(find(&samples, "pgbouncer_up")[0].value, 0.0);
        assert_eq!(find(&samples, "pgbouncer_errors")[0].value, 5.0);
        assert_eq!(collector.health().up, Liveness::Down);
    }

    #[test]
    fn concurrent_collections_are_serialized() {
        let console = MockConsole::typical_pgbouncer().with_delay(Duration::from_millis(5));
        let collector = Collector::new(
            Box::new(console.clone()),
            "pgbouncer",
            FailurePolicy::default(),
        );

        let counts: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| scope.spawn(|| collector.collect_once().len()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(counts, vec![84, 84]);
        assert_eq!(console.max_concurrent_queries(), 1);

        // Each cycle's queries stay contiguous.
        let calls = console.calls();
        assert_eq!(calls.len(), 10);
        let cycle: Vec<&str> = Topic::ALL.iter().map(|t| t.query()).collect();
        assert_eq!(calls[..5], cycle[..]);
        assert_eq!(calls[5..], cycle[..]);

        assert_eq!(collector.health().total_scrapes, 2);
    }

    #[test]
    fn close_releases_console_once() {
        let console = MockConsole::typical_pgbouncer();
        let collector = Collector::new(
            Box::new(console.clone()),
            "pgbouncer",
            FailurePolicy::default(),
        );

        assert_eq!(collector.close(), Ok(()));
        assert_eq!(collector.close(), Err(ConsoleError::Closed));
        assert_eq!(console.close_calls(), 1);

        let samples = collector.collect_once();
        assert_eq!(samples.len(), 4);
        assert_eq!(collector.health().up, Liveness::Down);
        assert!(console.calls().is_empty());
    }

    #[test]
    fn close_error_is_surfaced() {
        let console = MockConsole::new();
        console.fail_close(ConsoleError::Connection("broken pipe".to_string()));
        let collector = Collector::new(Box::new(console), "pgbouncer", FailurePolicy::default());

        assert_eq!(
            collector.close(),
            Err(ConsoleError::Connection("broken pipe".to_string()))
        );
    }
}
