//! pgbouncer-exporter-core — collection engine for the PgBouncer exporter.
//!
//! Provides:
//! - `registry` — static per-topic metric tables and their resolved identities
//! - `coerce` — console cell to sample value / label text conversion
//! - `extract` — row to metric sample mapping (key-value and labeled rows)
//! - `scrape` — one collection cycle over all console topics, failure accounting
//! - `collector` — the public describe/collect/close contract
//! - `console` — the admin console boundary (PostgreSQL protocol client, mock)

pub mod coerce;
pub mod collector;
pub mod console;
pub mod extract;
pub mod registry;
pub mod scrape;

pub use collector::Collector;
pub use console::{AdminConsole, Cell, ConsoleError, ConsoleRow, PgbouncerConsole};
pub use extract::MetricSample;
pub use registry::{MetricIdentity, MetricKind, MetricRegistry, Topic};
pub use scrape::{CycleResult, FailurePolicy, HealthState, Liveness, OnTopicFailure};

/// Crate version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
