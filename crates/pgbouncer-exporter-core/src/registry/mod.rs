//! Metric registry.
//!
//! Static description of every metric family the exporter can produce, one per
//! console topic, and the fully-qualified identities resolved from it at
//! startup. Nothing here changes after [`MetricRegistry::new`] returns, so the
//! registry is shared by reference without locking.

mod tables;

use std::collections::HashMap;
use std::sync::Arc;

/// Numeric kind of a value column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Monotonically increasing total.
    Counter,
    /// Instantaneous value.
    Gauge,
}

/// One value column of a console topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueColumnSpec {
    pub name: &'static str,
    pub kind: MetricKind,
    pub help: &'static str,
}

impl ValueColumnSpec {
    pub const fn counter(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            help,
        }
    }

    pub const fn gauge(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            help,
        }
    }
}

/// Static description of one metric family.
///
/// `labels` order is the output label order of every sample in the family.
#[derive(Debug, Clone, Copy)]
pub struct MetricFamilyDescriptor {
    pub prefix: &'static str,
    pub labels: &'static [&'static str],
    pub columns: &'static [ValueColumnSpec],
}

/// Fully-qualified metric: what the exposition layer advertises.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricIdentity {
    /// `<namespace>_<prefix>_<column>`.
    pub name: String,
    pub help: &'static str,
    pub kind: MetricKind,
    /// Label names, in output order.
    pub labels: &'static [&'static str],
}

/// A descriptor resolved against a namespace.
#[derive(Debug, Clone)]
pub struct ResolvedMetricFamily {
    labels: &'static [&'static str],
    metrics: HashMap<&'static str, Arc<MetricIdentity>>,
    /// Same identities as `metrics`, in declaration order.
    ordered: Vec<Arc<MetricIdentity>>,
}

impl ResolvedMetricFamily {
    /// Label column names in output order.
    pub fn labels(&self) -> &'static [&'static str] {
        self.labels
    }

    pub fn is_label(&self, column: &str) -> bool {
        self.labels.contains(&column)
    }

    /// Looks up the identity produced by a value column.
    pub fn metric(&self, column: &str) -> Option<&Arc<MetricIdentity>> {
        self.metrics.get(column)
    }

    /// Identities in declaration order.
    pub fn identities(&self) -> impl Iterator<Item = &Arc<MetricIdentity>> {
        self.ordered.iter()
    }

    /// Value column names mapped by this family.
    pub fn value_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.metrics.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Joins non-empty name parts with `_`.
fn fq_name(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Resolves a descriptor into metric identities under `namespace`.
pub fn resolve(namespace: &str, descriptor: &MetricFamilyDescriptor) -> ResolvedMetricFamily {
    let ordered: Vec<Arc<MetricIdentity>> = descriptor
        .columns
        .iter()
        .map(|column| {
            Arc::new(MetricIdentity {
                name: fq_name(&[namespace, descriptor.prefix, column.name]),
                help: column.help,
                kind: column.kind,
                labels: descriptor.labels,
            })
        })
        .collect();

    let metrics = descriptor
        .columns
        .iter()
        .zip(&ordered)
        .map(|(column, identity)| (column.name, Arc::clone(identity)))
        .collect();

    ResolvedMetricFamily {
        labels: descriptor.labels,
        metrics,
        ordered,
    }
}

/// Console topic: one `SHOW` command and its metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Lists,
    Stats,
    Pools,
    Databases,
    Config,
}

impl Topic {
    /// Every topic, in scrape order.
    pub const ALL: [Topic; 5] = [
        Topic::Lists,
        Topic::Stats,
        Topic::Pools,
        Topic::Databases,
        Topic::Config,
    ];

    /// Console command, sent verbatim.
    pub fn query(self) -> &'static str {
        match self {
            Topic::Lists => "SHOW LISTS;",
            Topic::Stats => "SHOW STATS;",
            Topic::Pools => "SHOW POOLS;",
            Topic::Databases => "SHOW DATABASES;",
            Topic::Config => "SHOW CONFIG;",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Topic::Lists => "LISTS",
            Topic::Stats => "STATS",
            Topic::Pools => "POOLS",
            Topic::Databases => "DATABASES",
            Topic::Config => "CONFIG",
        }
    }

    pub fn descriptor(self) -> &'static MetricFamilyDescriptor {
        match self {
            Topic::Lists => &tables::LISTS,
            Topic::Stats => &tables::STATS,
            Topic::Pools => &tables::POOLS,
            Topic::Databases => &tables::DATABASES,
            Topic::Config => &tables::CONFIG,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Exporter self-health identities.
#[derive(Debug, Clone)]
pub struct InternalMetrics {
    pub up: Arc<MetricIdentity>,
    pub errors: Arc<MetricIdentity>,
    pub scrape_last_time: Arc<MetricIdentity>,
    pub scrape_total: Arc<MetricIdentity>,
}

impl InternalMetrics {
    fn new(namespace: &str) -> Self {
        let identity = |name: &str, kind: MetricKind, help: &'static str| {
            Arc::new(MetricIdentity {
                name: fq_name(&[namespace, name]),
                help,
                kind,
                labels: &[],
            })
        };

        Self {
            up: identity("up", MetricKind::Gauge, "Whether pgbouncer is alive"),
            errors: identity("errors", MetricKind::Gauge, "Errors per scrape"),
            scrape_last_time: identity(
                "scrape_last_time",
                MetricKind::Gauge,
                "Last timestamp of scrape in unix epoch",
            ),
            scrape_total: identity(
                "scrape_total",
                MetricKind::Counter,
                "Total number of times pgbouncer has been scraped for metrics",
            ),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<MetricIdentity>> {
        [
            &self.up,
            &self.errors,
            &self.scrape_last_time,
            &self.scrape_total,
        ]
        .into_iter()
    }
}

/// All resolved families plus the internal identities, built once at startup.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    namespace: String,
    families: Vec<(Topic, ResolvedMetricFamily)>,
    internal: InternalMetrics,
}

impl MetricRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let families = Topic::ALL
            .iter()
            .map(|&topic| (topic, resolve(&namespace, topic.descriptor())))
            .collect();
        let internal = InternalMetrics::new(&namespace);

        Self {
            namespace,
            families,
            internal,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn family(&self, topic: Topic) -> &ResolvedMetricFamily {
        // Built from Topic::ALL, which lists variants in declaration order.
        &self.families[topic as usize].1
    }

    pub fn internal(&self) -> &InternalMetrics {
        &self.internal
    }

    /// Every identity the exporter can emit: topic families first, then the
    /// internal ones.
    pub fn identities(&self) -> impl Iterator<Item = &Arc<MetricIdentity>> {
        self.families
            .iter()
            .flat_map(|(_, family)| family.identities())
            .chain(self.internal.iter())
    }
}
