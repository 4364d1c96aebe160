use crate::source::RawStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// How a schema field derives its value from the raw stats document.
#[derive(Debug, Clone, Copy)]
pub enum ValueRule {
    /// Plain numeric field.
    Number,
    /// Number of distinct client agents in the nested `clients` object.
    ClientAgents,
    /// Total number of agent/version pairs in the nested `clients` object.
    ClientVersions,
}

/// One exported metric and the raw field it is derived from. The schema is
/// fixed at compile time: names and label keys never depend on input values.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub metric: &'static str,
    pub raw_key: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub rule: ValueRule,
    /// Absence of a required field counts as a schema mismatch; optional
    /// fields are simply skipped, since not every tracker reports them.
    pub required: bool,
}

/// The tracker stats schema. Raw keys follow the `stats.json` document
/// exposed by bittorrent-tracker style trackers.
pub const SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        metric: "bttrack_torrents",
        raw_key: "torrents",
        help: "Torrents seen",
        kind: MetricKind::Gauge,
        rule: ValueRule::Number,
        required: true,
    },
    FieldSpec {
        metric: "bttrack_torrents_active",
        raw_key: "activeTorrents",
        help: "Torrents currently active",
        kind: MetricKind::Gauge,
        rule: ValueRule::Number,
        required: false,
    },
    FieldSpec {
        metric: "bttrack_peers_all",
        raw_key: "peersAll",
        help: "All reported peers",
        kind: MetricKind::Gauge,
        rule: ValueRule::Number,
        required: true,
    },
    FieldSpec {
        metric: "bttrack_peers_seeder_only",
        raw_key: "peersSeederOnly",
        help: "Peers currently only seeding",
        kind: MetricKind::Gauge,
        rule: ValueRule::Number,
        required: false,
    },
    FieldSpec {
        metric: "bttrack_peers_leecher_only",
        raw_key: "peersLeecherOnly",
        help: "Peers currently only leeching",
        kind: MetricKind::Gauge,
        rule: ValueRule::Number,
        required: false,
    },
    FieldSpec {
        metric: "bttrack_peers_seeder_and_leecher",
        raw_key: "peersSeederAndLeecher",
        help: "Peers currently seeding and leeching",
        kind: MetricKind::Gauge,
        rule: ValueRule::Number,
        required: false,
    },
    FieldSpec {
        metric: "bttrack_peers_ipv4",
        raw_key: "peersIPv4",
        help: "Peers reported via IPv4",
        kind: MetricKind::Gauge,
        rule: ValueRule::Number,
        required: false,
    },
    FieldSpec {
        metric: "bttrack_peers_ipv6",
        raw_key: "peersIPv6",
        help: "Peers reported via IPv6",
        kind: MetricKind::Gauge,
        rule: ValueRule::Number,
        required: false,
    },
    FieldSpec {
        metric: "bttrack_clients",
        raw_key: "clients",
        help: "Unique client agents",
        kind: MetricKind::Gauge,
        rule: ValueRule::ClientAgents,
        required: false,
    },
    FieldSpec {
        metric: "bttrack_client_versions",
        raw_key: "clients",
        help: "Unique client agent versions",
        kind: MetricKind::Gauge,
        rule: ValueRule::ClientVersions,
        required: false,
    },
];

/// A single named, typed measurement. Identity is `(name, site)`; the only
/// label key on tracker metrics is `site`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub site: String,
    pub value: f64,
}

/// Result of normalizing one site's raw stats.
#[derive(Debug, Default, Clone)]
pub struct NormalizedSite {
    pub samples: Vec<MetricSample>,
    /// Raw keys that were required but absent, or present but malformed.
    pub mismatches: Vec<&'static str>,
    /// Negative values on counter-typed fields, clamped to zero.
    pub clamped: u32,
}

pub fn normalize(site: &str, raw: &RawStats) -> NormalizedSite {
    normalize_with(site, raw, SCHEMA)
}

/// Pure mapping from raw stats to typed samples. Missing or malformed fields
/// degrade the result (partial emission plus mismatch bookkeeping), they
/// never abort it.
pub fn normalize_with(site: &str, raw: &RawStats, schema: &[FieldSpec]) -> NormalizedSite {
    let mut normalized = NormalizedSite::default();

    for spec in schema {
        if !raw.contains(spec.raw_key) {
            if spec.required {
                normalized.mismatches.push(spec.raw_key);
            }
            continue;
        }

        let value = match extract(spec, raw) {
            Some(value) => value,
            None => {
                normalized.mismatches.push(spec.raw_key);
                continue;
            }
        };

        let value = match spec.kind {
            MetricKind::Counter if value < 0.0 => {
                normalized.clamped += 1;
                0.0
            }
            _ => value,
        };

        normalized.samples.push(MetricSample {
            name: spec.metric,
            help: spec.help,
            kind: spec.kind,
            site: site.to_string(),
            value,
        });
    }

    normalized
}

fn extract(spec: &FieldSpec, raw: &RawStats) -> Option<f64> {
    match spec.rule {
        ValueRule::Number => raw.number(spec.raw_key),
        ValueRule::ClientAgents => raw.object(spec.raw_key).map(|agents| agents.len() as f64),
        ValueRule::ClientVersions => {
            let agents = raw.object(spec.raw_key)?;
            let mut total = 0usize;
            for versions in agents.values() {
                total += versions.as_object()?.len();
            }
            Some(total as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn raw(value: Value) -> RawStats {
        match value {
            Value::Object(map) => RawStats::new(map),
            _ => panic!("test input must be a JSON object"),
        }
    }

    fn full_stats() -> RawStats {
        raw(json!({
            "torrents": 10,
            "activeTorrents": 4,
            "peersAll": 42,
            "peersSeederOnly": 20,
            "peersLeecherOnly": 15,
            "peersSeederAndLeecher": 7,
            "peersIPv4": 30,
            "peersIPv6": 12,
            "clients": {
                "qBittorrent": {"4.5.0": 5, "4.6.1": 2},
                "Transmission": {"3.00": 4}
            }
        }))
    }

    #[test]
    fn test_full_input_produces_full_schema() {
        let normalized = normalize("example", &full_stats());

        assert_eq!(normalized.samples.len(), SCHEMA.len());
        assert!(normalized.mismatches.is_empty());
        assert_eq!(normalized.clamped, 0);

        let names: Vec<&str> = normalized.samples.iter().map(|s| s.name).collect();
        let expected: Vec<&str> = SCHEMA.iter().map(|s| s.metric).collect();
        assert_eq!(names, expected);

        for sample in &normalized.samples {
            assert_eq!(sample.site, "example");
            assert_eq!(sample.kind, MetricKind::Gauge);
        }
    }

    #[test]
    fn test_sample_identity_is_unique() {
        let normalized = normalize("example", &full_stats());
        let mut identities: Vec<(&str, &str)> = normalized
            .samples
            .iter()
            .map(|s| (s.name, s.site.as_str()))
            .collect();
        identities.sort();
        identities.dedup();
        assert_eq!(identities.len(), normalized.samples.len());
    }

    #[test]
    fn test_shape_is_independent_of_values() {
        let low = normalize("example", &raw(json!({"torrents": 0, "peersAll": 0})));
        let high = normalize(
            "example",
            &raw(json!({"torrents": 90000, "peersAll": 1234567})),
        );

        let shape = |n: &NormalizedSite| -> Vec<&'static str> {
            n.samples.iter().map(|s| s.name).collect()
        };
        assert_eq!(shape(&low), shape(&high));
    }

    #[test]
    fn test_client_metrics_derivation() {
        let normalized = normalize("example", &full_stats());

        let value = |name: &str| {
            normalized
                .samples
                .iter()
                .find(|s| s.name == name)
                .map(|s| s.value)
        };
        // 2 agents, 3 agent/version pairs in total
        assert_eq!(value("bttrack_clients"), Some(2.0));
        assert_eq!(value("bttrack_client_versions"), Some(3.0));
    }

    #[test]
    fn test_missing_optional_fields_are_skipped_silently() {
        let normalized = normalize("example", &raw(json!({"torrents": 1, "peersAll": 2})));

        assert_eq!(normalized.samples.len(), 2);
        assert!(normalized.mismatches.is_empty());
    }

    #[test]
    fn test_missing_required_field_is_a_mismatch() {
        let normalized = normalize("example", &raw(json!({"peersAll": 2})));

        assert_eq!(normalized.mismatches, vec!["torrents"]);
        assert_eq!(normalized.samples.len(), 1);
    }

    #[test]
    fn test_malformed_field_is_a_mismatch() {
        let normalized = normalize(
            "example",
            &raw(json!({"torrents": "lots", "peersAll": 2, "clients": ["qBittorrent"]})),
        );

        assert!(normalized.mismatches.contains(&"torrents"));
        // both clients-derived fields fail on the array
        assert_eq!(
            normalized.mismatches.iter().filter(|&&k| k == "clients").count(),
            2
        );
    }

    #[test]
    fn test_negative_counter_values_are_clamped() {
        const COUNTER_SCHEMA: &[FieldSpec] = &[FieldSpec {
            metric: "bttrack_downloads_total",
            raw_key: "downloads",
            help: "Completed downloads",
            kind: MetricKind::Counter,
            rule: ValueRule::Number,
            required: true,
        }];

        let normalized =
            normalize_with("example", &raw(json!({"downloads": -3})), COUNTER_SCHEMA);

        assert_eq!(normalized.clamped, 1);
        assert_eq!(normalized.samples[0].value, 0.0);
    }

    #[test]
    fn test_negative_gauge_values_pass_through() {
        let normalized = normalize(
            "example",
            &raw(json!({"torrents": -1, "peersAll": 2})),
        );

        assert_eq!(normalized.clamped, 0);
        let torrents = normalized
            .samples
            .iter()
            .find(|s| s.name == "bttrack_torrents")
            .unwrap();
        assert_eq!(torrents.value, -1.0);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let stats = full_stats();
        let a = normalize("example", &stats);
        let b = normalize("example", &stats);
        assert_eq!(a.samples, b.samples);
    }
}
