//! Scrape cycles.
//!
//! One cycle runs every topic query in [`Topic::ALL`] order, extracts samples
//! from the rows, and folds per-topic failures into an error count that drives
//! the liveness verdict.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::console::{AdminConsole, ConsoleError};
use crate::extract::{MetricSample, Strategy, extract};
use crate::registry::{MetricRegistry, Topic};

/// What to do with the remaining topics after one fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnTopicFailure {
    /// Count the failure and keep scraping.
    #[default]
    Continue,
    /// Skip the rest of the cycle and report down.
    Abort,
}

/// Failure accounting for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    /// Failed topics at which liveness goes down.
    pub error_threshold: usize,
    pub on_failure: OnTopicFailure,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            error_threshold: 5,
            on_failure: OnTopicFailure::Continue,
        }
    }
}

impl FailurePolicy {
    pub fn verdict(&self, errors: usize) -> Liveness {
        if errors >= self.error_threshold.max(1) {
            Liveness::Down
        } else {
            Liveness::Up
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Up,
    Down,
}

impl Liveness {
    pub fn as_value(self) -> f64 {
        match self {
            Liveness::Up => 1.0,
            Liveness::Down => 0.0,
        }
    }
}

/// Long-lived health gauges, updated once per cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthState {
    pub up: Liveness,
    /// Failed topics in the most recent cycle.
    pub errors: usize,
    /// Unix seconds at the start of the most recent cycle.
    pub last_scrape_time: f64,
    pub total_scrapes: u64,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            up: Liveness::Up,
            errors: 0,
            last_scrape_time: 0.0,
            total_scrapes: 0,
        }
    }
}

/// Outcome of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleResult {
    pub samples: usize,
    pub failed_topics: usize,
    pub verdict: Liveness,
    pub duration: Duration,
}

/// Runs scrape cycles against a console.
#[derive(Debug)]
pub struct ScrapeOrchestrator<'a> {
    registry: &'a MetricRegistry,
    policy: FailurePolicy,
}

impl<'a> ScrapeOrchestrator<'a> {
    pub fn new(registry: &'a MetricRegistry, policy: FailurePolicy) -> Self {
        Self { registry, policy }
    }

    /// Runs one full cycle and updates `health`.
    ///
    /// Topic failures are counted, never returned.
    pub fn run_cycle(
        &self,
        console: &mut dyn AdminConsole,
        health: &mut HealthState,
    ) -> (Vec<MetricSample>, CycleResult) {
        let started = Instant::now();
        health.last_scrape_time = chrono::Utc::now().timestamp() as f64;
        health.total_scrapes += 1;

        let mut samples = Vec::new();
        let mut failed_topics = 0;
        let mut aborted = false;

        for topic in Topic::ALL {
            match self.scrape_topic(console, topic) {
                Ok(topic_samples) => samples.extend(topic_samples),
                Err(e) => {
                    warn!(topic = %topic, error = %e, "topic scrape failed");
                    failed_topics += 1;
                    if self.policy.on_failure == OnTopicFailure::Abort {
                        aborted = true;
                        break;
                    }
                }
            }
        }

        // Abort stops at the first failure, so the threshold does not apply.
        let verdict = if aborted {
            Liveness::Down
        } else {
            self.policy.verdict(failed_topics)
        };
        if verdict != health.up {
            info!(
                up = verdict == Liveness::Up,
                failed_topics, "pgbouncer liveness changed"
            );
        }
        health.up = verdict;
        health.errors = failed_topics;

        let result = CycleResult {
            samples: samples.len(),
            failed_topics,
            verdict,
            duration: started.elapsed(),
        };
        debug!(
            samples = result.samples,
            failed_topics,
            duration_ms = result.duration.as_millis() as u64,
            "scrape cycle finished"
        );

        (samples, result)
    }

    fn scrape_topic(
        &self,
        console: &mut dyn AdminConsole,
        topic: Topic,
    ) -> Result<Vec<MetricSample>, ConsoleError> {
        let rows = console.query(topic.query())?;
        let family = self.registry.family(topic);
        let strategy = Strategy::for_family(family);

        Ok(rows
            .iter()
            .flat_map(|row| extract(family, row, strategy))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::MockConsole;

    fn failing(k: usize) -> MockConsole {
        let console = MockConsole::typical_pgbouncer();
        for topic in Topic::ALL.iter().take(k) {
            console.fail(topic.query(), ConsoleError::Query("boom".to_string()));
        }
        console
    }

    #[test]
    fn healthy_cycle() {
        let registry = MetricRegistry::new("pgbouncer");
        let orchestrator = ScrapeOrchestrator::new(&registry, FailurePolicy::default());
        let mut console = MockConsole::typical_pgbouncer();
        let mut health = HealthState::default();

        let (samples, result) = orchestrator.run_cycle(&mut console, &mut health);

        assert_eq!(result.failed_topics, 0);
        assert_eq!(result.verdict, Liveness::Up);
        assert_eq!(result.samples, samples.len());
        assert_eq!(
            console.calls(),
            Topic::ALL.iter().map(|t| t.query()).collect::<Vec<_>>()
        );

        // LISTS: 12, STATS: 2 x 14, POOLS: 2 x 9, DATABASES: 2 x 6, CONFIG: 10 known keys.
        assert_eq!(samples.len(), 12 + 28 + 18 + 12 + 10);

        assert_eq!(health.total_scrapes, 1);
        assert_eq!(health.errors, 0);
        assert!(health.last_scrape_time > 0.0);
    }

    #[test]
    fn failures_up_to_threshold() {
        let registry = MetricRegistry::new("pgbouncer");
        let orchestrator = ScrapeOrchestrator::new(&registry, FailurePolicy::default());

        for k in 0..=5 {
            let mut console = failing(k);
            let mut health = HealthState::default();
            let (_, result) = orchestrator.run_cycle(&mut console, &mut health);

            assert_eq!(result.failed_topics, k);
            assert_eq!(health.errors, k);
            let expected = if k >= 5 { Liveness::Down } else { Liveness::Up };
            assert_eq!(result.verdict, expected, "k = {k}");
            assert_eq!(console.calls().len(), 5);
        }
    }

    #[test]
    fn failed_topic_does_not_hide_others() {
        let registry = MetricRegistry::new("pgbouncer");
        let orchestrator = ScrapeOrchestrator::new(&registry, FailurePolicy::default());
        let mut console = MockConsole::typical_pgbouncer();
        console.fail("SHOW STATS;", ConsoleError::Decode("bad row".to_string()));
        let mut health = HealthState::default();

        let (samples, result) = orchestrator.run_cycle(&mut console, &mut health);

        assert_eq!(result.failed_topics, 1);
        assert!(samples.iter().all(|s| !s.name().starts_with("pgbouncer_stats_")));
        assert!(samples.iter().any(|s| s.name() == "pgbouncer_pools_cl_active"));
    }

    #[test]
    fn abort_stops_after_first_failure() {
        let registry = MetricRegistry::new("pgbouncer");
        let policy = FailurePolicy {
            error_threshold: 1,
            on_failure: OnTopicFailure::Abort,
        };
        let orchestrator = ScrapeOrchestrator::new(&registry, policy);
        let mut console = MockConsole::typical_pgbouncer();
        console.fail("SHOW STATS;", ConsoleError::Query("boom".to_string()));
        let mut health = HealthState::default();

        let (samples, result) = orchestrator.run_cycle(&mut console, &mut health);

        assert_eq!(console.calls(), vec!["SHOW LISTS;", "SHOW STATS;"]);
        assert_eq!(result.failed_topics, 1);
        assert_eq!(result.verdict, Liveness::Down);
        assert_eq!(samples.len(), 12);
    }

    #[test]
    fn abort_marks_down_regardless_of_threshold() {
        let registry = MetricRegistry::new("pgbouncer");
        let policy = FailurePolicy {
            error_threshold: 5,
            on_failure: OnTopicFailure::Abort,
        };
        let orchestrator = ScrapeOrchestrator::new(&registry, policy);
        let mut console = MockConsole::unauthorized_pgbouncer();
        let mut health = HealthState::default();

        let (samples, result) = orchestrator.run_cycle(&mut console, &mut health);

        assert_eq!(console.calls(), vec!["SHOW LISTS;"]);
        assert!(samples.is_empty());
        assert_eq!(result.failed_topics, 1);
        assert_eq!(result.verdict, Liveness::Down);
        assert_eq!(health.up, Liveness::Down);
        assert_eq!(health.errors, 1);
    }

    #[test]
    fn abort_without_failures_stays_up() {
        let registry = MetricRegistry::new("pgbouncer");
        let policy = FailurePolicy {
            error_threshold: 5,
            on_failure: OnTopicFailure::Abort,
        };
        let orchestrator = ScrapeOrchestrator::new(&registry, policy);
        let mut console = MockConsole::typical_pgbouncer();
        let mut health = HealthState::default();

        let (_, result) = orchestrator.run_cycle(&mut console, &mut health);

        assert_eq!(console.calls().len(), 5);
        assert_eq!(result.verdict, Liveness::Up);
    }

    #[test]
    fn health_recovers_and_counts_cycles() {
        let registry = MetricRegistry::new("pgbouncer");
        let orchestrator = ScrapeOrchestrator::new(&registry, FailurePolicy::default());
        let mut health = HealthState::default();

        orchestrator.run_cycle(&mut MockConsole::unauthorized_pgbouncer(), &mut health);
        assert_eq!(health.up, Liveness::Down);
        assert_eq!(health.errors, 5);

        orchestrator.run_cycle(&mut MockConsole::typical_pgbouncer(), &mut health);
        assert_eq!(health.up, Liveness::Up);
        assert_eq!(health.errors, 0);
        assert_eq!(health.total_scrapes, 2);
    }

    #[test]
    fn zero_threshold_behaves_like_one() {
        let policy = FailurePolicy {
            error_threshold: 0,
            on_failure: OnTopicFailure::Continue,
        };
        assert_eq!(policy.verdict(0), Liveness::Up);
        assert_eq!(policy.verdict(1), Liveness::Down);
    }
}
