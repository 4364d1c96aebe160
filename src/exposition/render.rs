use crate::schema::MetricKind;
use crate::snapshot::Snapshot;
use anyhow::Result;
use prometheus::proto;
use prometheus::{Encoder, Registry, TextEncoder};
use std::collections::HashMap;

/// Converts an immutable snapshot into Prometheus metric families. Samples
/// sharing a name collapse into one family (one `Metric` per site), in
/// schema order.
pub fn snapshot_families(snapshot: &Snapshot) -> Vec<proto::MetricFamily> {
    let mut families: Vec<proto::MetricFamily> = Vec::new();
    let mut index: HashMap<&'static str, usize> = HashMap::new();

    for sample in &snapshot.samples {
        let family_idx = *index.entry(sample.name).or_insert_with(|| {
            let mut family = proto::MetricFamily::default();
            family.set_name(sample.name.to_string());
            family.set_help(sample.help.to_string());
            family.set_field_type(match sample.kind {
                MetricKind::Counter => proto::MetricType::COUNTER,
                MetricKind::Gauge => proto::MetricType::GAUGE,
            });
            families.push(family);
            families.len() - 1
        });

        let mut label = proto::LabelPair::default();
        label.set_name("site".to_string());
        label.set_value(sample.site.clone());

        let mut metric = proto::Metric::default();
        metric.mut_label().push(label);
        match sample.kind {
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

        families[family_idx].mut_metric().push(metric);
    }

    families
}

/// Renders the snapshot (when present) followed by the exporter's own
/// registry in the text exposition format.
pub fn render(snapshot: Option<&Snapshot>, registry: &Registry) -> Result<String> {
    let mut families = match snapshot {
        Some(snapshot) => snapshot_families(snapshot),
        None => Vec::new(),
    };
    families.extend(registry.gather());

    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    encoder.encode(&families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
