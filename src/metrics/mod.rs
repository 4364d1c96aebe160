use chrono::Utc;
use prometheus::{Histogram, HistogramOpts, HistogramTimer, IntCounterVec, IntGauge, Opts, Registry};

/// A tracker read failed outright.
pub const ERROR_REASON_FETCH: &str = "fetch";
/// A tracker answered, but with missing or malformed fields.
pub const ERROR_REASON_SCHEMA: &str = "schema";

/// The exporter's own health instrumentation, kept on an owned registry so
/// tests construct it in isolation. Unlike tracker metrics these are genuine
/// process-lifetime counters and survive snapshot turnover.
pub struct SelfMetrics {
    registry: Registry,
    collection_duration: Histogram,
    collection_errors: IntCounterVec,
    last_success: IntGauge,
    last_timestamp: IntGauge,
}

impl SelfMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let collection_duration = Histogram::with_opts(HistogramOpts::new(
            "bttrack_collection_duration_seconds",
            "Time spent collecting tracker statistics",
        ))?;
        registry.register(Box::new(collection_duration.clone()))?;

        let collection_errors = IntCounterVec::new(
            Opts::new(
                "bttrack_collection_errors_total",
                "Errors encountered while collecting tracker statistics",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(collection_errors.clone()))?;

        let last_success = IntGauge::new(
            "bttrack_last_collection_success",
            "Whether the most recent collection cycle completed without errors",
        )?;
        registry.register(Box::new(last_success.clone()))?;

        let last_timestamp = IntGauge::new(
            "bttrack_last_collection_timestamp_seconds",
            "Unix time of the last fully successful collection cycle",
        )?;
        registry.register(Box::new(last_timestamp.clone()))?;

        // Initialize both reason labels so the exported shape does not
        // depend on which failure happens first.
        collection_errors.with_label_values(&[ERROR_REASON_FETCH]);
        collection_errors.with_label_values(&[ERROR_REASON_SCHEMA]);

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            collection_duration,
            collection_errors,
            last_success,
            last_timestamp,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Observes the collection duration when the returned timer drops.
    pub fn start_collection_timer(&self) -> HistogramTimer {
        self.collection_duration.start_timer()
    }

    pub fn record_fetch_error(&self) {
        self.collection_errors
            .with_label_values(&[ERROR_REASON_FETCH])
            .inc();
    }

    pub fn record_schema_mismatches(&self, count: u64) {
        self.collection_errors
            .with_label_values(&[ERROR_REASON_SCHEMA])
            .inc_by(count);
    }

    pub fn mark_success(&self) {
        self.last_success.set(1);
        self.last_timestamp.set(Utc::now().timestamp());
    }

    pub fn mark_degraded(&self) {
        self.last_success.set(0);
    }

    pub fn errors_total(&self, reason: &str) -> u64 {
        self.collection_errors.with_label_values(&[reason]).get()
    }

    pub fn last_success_value(&self) -> i64 {
        self.last_success.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_counters_start_at_zero() {
        let metrics = SelfMetrics::new().unwrap();
        assert_eq!(metrics.errors_total(ERROR_REASON_FETCH), 0);
        assert_eq!(metrics.errors_total(ERROR_REASON_SCHEMA), 0);
    }

    #[test]
    fn test_error_counters_accumulate() {
        let metrics = SelfMetrics::new().unwrap();

        metrics.record_fetch_error();
        metrics.record_fetch_error();
        metrics.record_schema_mismatches(3);

        assert_eq!(metrics.errors_total(ERROR_REASON_FETCH), 2);
        assert_eq!(metrics.errors_total(ERROR_REASON_SCHEMA), 3);
    }

    #[test]
    fn test_success_flag_toggles() {
        let metrics = SelfMetrics::new().unwrap();

        metrics.mark_success();
        assert_eq!(metrics.last_success_value(), 1);

        metrics.mark_degraded();
        assert_eq!(metrics.last_success_value(), 0);
    }

    #[test]
    fn test_registry_exposes_all_families() {
        let metrics = SelfMetrics::new().unwrap();
        metrics.mark_success();

        let names: Vec<String> = metrics
            .registry()
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();

        for expected in [
            "bttrack_collection_duration_seconds",
            "bttrack_collection_errors_total",
            "bttrack_last_collection_success",
            "bttrack_last_collection_timestamp_seconds",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }
}
