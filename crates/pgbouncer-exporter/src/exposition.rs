//! Bridge from core samples to Prometheus metric families.

use std::collections::HashMap;
use std::sync::Arc;

use prometheus::core::{Collector as PromCollector, Desc};
use prometheus::proto::{self, MetricFamily, MetricType};

use pgbouncer_exporter_core::{Collector, MetricIdentity, MetricKind, MetricSample};

/// Registers the core collector with a `prometheus::Registry`.
///
/// Descriptors come from the static registry, so registration never touches
/// the console. Every `gather()` runs one scrape cycle.
pub(crate) struct PgbouncerMetrics {
    collector: Arc<Collector>,
    descs: Vec<Desc>,
}

impl PgbouncerMetrics {
    /// Fails when the namespace produces invalid metric names.
    pub(crate) fn new(collector: Arc<Collector>) -> prometheus::Result<Self> {
        let descs = collector
            .describe_all()
            .iter()
            .map(|identity| to_desc(identity))
            .collect::<prometheus::Result<Vec<_>>>()?;

        Ok(Self { collector, descs })
    }
}

fn to_desc(identity: &MetricIdentity) -> prometheus::Result<Desc> {
    Desc::new(
        identity.name.clone(),
        identity.help.to_string(),
        identity.labels.iter().map(|l| l.to_string()).collect(),
        HashMap::new(),
    )
}

impl PromCollector for PgbouncerMetrics {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        to_metric_families(&self.collector.collect_once())
    }
}

/// Groups samples by metric name, keeping first-seen order.
pub(crate) fn to_metric_families(samples: &[MetricSample]) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();
    let mut by_name: HashMap<&str, usize> = HashMap::new();

    for sample in samples {
        let idx = *by_name.entry(sample.name()).or_insert_with(|| {
            families.push(new_family(&sample.identity));
            families.len() - 1
        });
        families[idx].mut_metric().push(to_metric(sample));
    }

    families
}

fn new_family(identity: &MetricIdentity) -> MetricFamily {
    let mut family = MetricFamily::default();
    family.set_name(identity.name.clone());
    family.set_help(identity.help.to_string());
    family.set_field_type(match identity.kind {
        MetricKind::Counter => MetricType::COUNTER,
        MetricKind::Gauge => MetricType::GAUGE,
    });
    family
}

fn to_metric(sample: &MetricSample) -> proto::Metric {
    let mut metric = proto::Metric::default();

    for (name, value) in sample.label_pairs() {
        let mut pair = proto::LabelPair::default();
        pair.set_name(name.to_string());
        pair.set_value(value.to_string());
        metric.mut_label().push(pair);
    }

    match sample.identity.kind {
        MetricKind::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(sample.value);
            metric.set_counter(counter);
        }
        MetricKind::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(sample.value);
            metric.set_gauge(gauge);
        }
    }

    metric
}
