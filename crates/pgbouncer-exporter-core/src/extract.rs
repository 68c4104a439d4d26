//! Row extraction: console rows to metric samples.

use std::sync::Arc;

use crate::coerce::{to_label_text, to_number};
use crate::console::ConsoleRow;
use crate::registry::{MetricIdentity, ResolvedMetricFamily};

/// One time-series point.
///
/// `labels` always has one value per label of the owning family, in the
/// family's declared order. `value` may be NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub identity: Arc<MetricIdentity>,
    pub value: f64,
    pub labels: Vec<String>,
}

impl MetricSample {
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// (label name, label value) pairs in declared order.
    pub fn label_pairs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.identity
            .labels
            .iter()
            .copied()
            .zip(self.labels.iter().map(String::as_str))
    }
}

/// How a topic's rows map to samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One row per metric: first column is the key, second the value.
    /// Used by label-less topics (LISTS, CONFIG).
    KeyValue,
    /// One row per label set, one sample per mapped value column.
    Labeled,
}

impl Strategy {
    pub fn for_family(family: &ResolvedMetricFamily) -> Self {
        if family.labels().is_empty() {
            Strategy::KeyValue
        } else {
            Strategy::Labeled
        }
    }
}

/// Extracts every sample a row yields. Never fails: unknown keys and columns
/// produce nothing, malformed cells produce NaN or empty labels.
pub fn extract(
    family: &ResolvedMetricFamily,
    row: &ConsoleRow,
    strategy: Strategy,
) -> Vec<MetricSample> {
    match strategy {
        Strategy::KeyValue => extract_key_value(family, row).into_iter().collect(),
        Strategy::Labeled => extract_labeled(family, row),
    }
}

fn extract_key_value(family: &ResolvedMetricFamily, row: &ConsoleRow) -> Option<MetricSample> {
    // SHOW CONFIG adds a trailing `changeable` column; only the first two count.
    let key = to_label_text(row.cell_at(0)?);
    let value = row.cell_at(1)?;
    let identity = family.metric(&key)?;

    Some(MetricSample {
        identity: Arc::clone(identity),
        value: to_number(value),
        labels: Vec::new(),
    })
}

fn extract_labeled(family: &ResolvedMetricFamily, row: &ConsoleRow) -> Vec<MetricSample> {
    let labels: Vec<String> = family
        .labels()
        .iter()
        .map(|label| row.get(label).map(to_label_text).unwrap_or_default())
        .collect();

    row.iter()
        .filter(|(column, _)| !family.is_label(column))
        .filter_map(|(column, cell)| {
            family.metric(column).map(|identity| MetricSample {
                identity: Arc::clone(identity),
                value: to_number(cell),
                labels: labels.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Cell;
    use crate::registry::{MetricRegistry, Topic};
    use proptest::prelude::{Just, any, prop, prop_assert_eq, proptest};
    use proptest::strategy::Strategy as _;

    fn registry() -> MetricRegistry {
        MetricRegistry::new("pgbouncer")
    }

    #[test]
    fn strategy_follows_label_schema() {
        let registry = registry();
        assert_eq!(
            Strategy::for_family(registry.family(Topic::Lists)),
            Strategy::KeyValue
        );
        assert_eq!(
            Strategy::for_family(registry.family(Topic::Config)),
            Strategy::KeyValue
        );
        assert_eq!(
            Strategy::for_family(registry.family(Topic::Pools)),
            Strategy::Labeled
        );
    }

    #[test]
    fn key_value_row() {
        let registry = registry();
        let family = registry.family(Topic::Lists);
        let row = ConsoleRow::new().with("item", "pools").with("value", 4_i64);

        let samples = extract(family, &row, Strategy::KeyValue);

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name(), "pgbouncer_lists_pools");
        assert_eq!(samples[0].value, 4.0);
        assert!(samples[0].labels.is_empty());
    }

    #[test]
    fn key_value_ignores_trailing_columns() {
        let registry = registry();
        let family = registry.family(Topic::Config);
        let row = ConsoleRow::new()
            .with("key", "max_client_conn")
            .with("value", "100")
            .with("changeable", "yes");

        let samples = extract(family, &row, Strategy::KeyValue);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name(), "pgbouncer_config_max_client_conn");
        assert_eq!(samples[0].value, 100.0);
    }

    #[test]
    fn key_value_unknown_key_or_short_row() {
        let registry = registry();
        let family = registry.family(Topic::Config);

        let unknown = ConsoleRow::new().with("key", "logfile").with("value", "/tmp/x");
        assert!(extract(family, &unknown, Strategy::KeyValue).is_empty());

        let short = ConsoleRow::new().with("key", "max_client_conn");
        assert!(extract(family, &short, Strategy::KeyValue).is_empty());

        assert!(extract(family, &ConsoleRow::new(), Strategy::KeyValue).is_empty());
    }

    #[test]
    fn key_value_malformed_value_is_nan() {
        let registry = registry();
        let family = registry.family(Topic::Config);
        let row = ConsoleRow::new().with("key", "pkt_buf").with("value", "n/a");

        let samples = extract(family, &row, Strategy::KeyValue);
        assert_eq!(samples.len(), 1);
        assert!(samples[0].value.is_nan());
    }

    #[test]
    fn labeled_row_keeps_declared_label_order() {
        let registry = registry();
        let family = registry.family(Topic::Pools);
        let row = ConsoleRow::new()
            .with("database", "db1")
            .with("user", "u1")
            .with("pool_mode", "transaction")
            .with("cl_active", 3_i64);

        let samples = extract(family, &row, Strategy::Labeled);

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name(), "pgbouncer_pools_cl_active");
        assert_eq!(samples[0].value, 3.0);
        assert_eq!(samples[0].labels, vec!["db1", "u1", "transaction"]);
        assert_eq!(
            samples[0].label_pairs().collect::<Vec<_>>(),
            vec![
                ("database", "db1"),
                ("user", "u1"),
                ("pool_mode", "transaction")
            ]
        );
    }

    #[test]
    fn labeled_row_ignores_unknown_columns() {
        let registry = registry();
        let family = registry.family(Topic::Stats);
        let row = ConsoleRow::new()
            .with("database", "app")
            .with("total_server_assignment_count", "17")
            .with("total_xact_count", "12");

        let samples = extract(family, &row, Strategy::Labeled);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name(), "pgbouncer_stats_total_xact_count");
        assert_eq!(samples[0].labels, vec!["app"]);
    }

    #[test]
    fn labeled_row_null_and_missing_labels_are_empty() {
        let registry = registry();
        let family = registry.family(Topic::Databases);
        let row = ConsoleRow::new()
            .with("name", "pgbouncer")
            .with("host", Cell::Null)
            .with("port", 6432_i64)
            .with("pool_size", "2");

        let samples = extract(family, &row, Strategy::Labeled);
        assert_eq!(samples.len(), 1);
        assert_eq!(
            samples[0].labels,
            vec!["pgbouncer", "", "6432", "", "", ""]
        );
    }

    #[test]
    fn labeled_row_emits_nan_samples() {
        let registry = registry();
        let family = registry.family(Topic::Pools);
        let row = ConsoleRow::new()
            .with("database", "db1")
            .with("maxwait", Cell::Null)
            .with("maxwait_us", "12");

        let samples = extract(family, &row, Strategy::Labeled);
        assert_eq!(samples.len(), 2);
        assert!(samples[0].value.is_nan());
        assert_eq!(samples[1].value, 12.0);
    }

    proptest! {
        #[test]
        fn label_count_is_independent_of_column_order(
            columns in Just(vec![
                ("database", "db1"),
                ("user", "u1"),
                ("pool_mode", "session"),
                ("cl_active", "1"),
                ("sv_idle", "2"),
                ("extra", "x"),
            ])
            .prop_shuffle(),
            keep in prop::collection::vec(any::<bool>(), 6),
        ) {
            let registry = registry();
            let family = registry.family(Topic::Pools);
            let row: ConsoleRow = columns
                .iter()
                .zip(&keep)
                .filter(|(_, keep)| **keep)
                .map(|(column, _)| *column)
                .collect();

            for sample in extract(family, &row, Strategy::Labeled) {
                prop_assert_eq!(sample.labels.len(), family.labels().len());
                let database = row.get("database").map(to_label_text).unwrap_or_default();
                prop_assert_eq!(&sample.labels[0], &database);
            }
        }
    }
}
