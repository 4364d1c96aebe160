use crate::config::CollectorConfig;
use crate::metrics::SelfMetrics;
use crate::schema;
use crate::snapshot::{Snapshot, SnapshotCache};
use crate::source::{RawStats, SourceError, StatsSource};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// One configured tracker: its label value and its status channel.
pub struct SiteSource {
    pub name: String,
    pub source: Arc<dyn StatsSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Fetching,
}

/// Capped-exponential retry gate. After N consecutive failed cycles the next
/// attempt is held back by `initial * 2^(N-1)`, capped at `max`.
#[derive(Debug, Clone, Copy, Default)]
struct FailureBackoff {
    consecutive_failures: u32,
    retry_after: Option<Instant>,
}

impl FailureBackoff {
    fn on_failure(&mut self, initial: Duration, max: Duration) {
        self.consecutive_failures += 1;
        let exponent = self.consecutive_failures.saturating_sub(1).min(16);
        let delay = initial.saturating_mul(1 << exponent).min(max);
        self.retry_after = Some(Instant::now() + delay);
    }

    fn on_success(&mut self) {
        self.consecutive_failures = 0;
        self.retry_after = None;
    }

    fn holds(&self) -> bool {
        self.retry_after
            .map_or(false, |retry_after| Instant::now() < retry_after)
    }
}

/// Drives tracker reads into the snapshot cache.
///
/// Refresh policy is lazy-on-read: a scrape triggers a collection cycle only
/// once the current snapshot is older than the refresh interval, so the
/// interval doubles as a grace window absorbing scrape bursts. At most one
/// cycle runs at a time; concurrent triggers collapse into it.
pub struct RefreshScheduler {
    sites: Vec<SiteSource>,
    cache: SnapshotCache,
    metrics: SelfMetrics,
    refresh_interval: Duration,
    timeout: Duration,
    backoff_initial: Duration,
    backoff_max: Duration,
    /// Single-flight guard: whoever holds it is the one refreshing.
    refresh: Mutex<()>,
    state: RwLock<RefreshState>,
    backoff: RwLock<FailureBackoff>,
    /// Failure summary of the most recent cycle, kept outside the snapshot
    /// so a cold start that never published anything still has a diagnosis.
    last_error: RwLock<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: String,
    pub sites: usize,
    pub snapshot_age_secs: Option<u64>,
    pub degraded: bool,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl RefreshScheduler {
    pub fn new(
        sites: Vec<SiteSource>,
        cache: SnapshotCache,
        metrics: SelfMetrics,
        collector: &CollectorConfig,
    ) -> Self {
        Self {
            sites,
            cache,
            metrics,
            refresh_interval: collector.refresh_interval(),
            timeout: collector.timeout(),
            backoff_initial: collector.backoff_initial(),
            backoff_max: collector.backoff_max(),
            refresh: Mutex::new(()),
            state: RwLock::new(RefreshState::Idle),
            backoff: RwLock::new(FailureBackoff::default()),
            last_error: RwLock::new(None),
        }
    }

    pub fn metrics(&self) -> &SelfMetrics {
        &self.metrics
    }

    pub async fn get_current(&self) -> Option<Arc<Snapshot>> {
        self.cache.get_current().await
    }

    pub async fn state(&self) -> RefreshState {
        *self.state.read().await
    }

    /// Returns the current snapshot, refreshing it first when it is due.
    ///
    /// Cold start blocks on the first collection cycle (bounded by the read
    /// timeout). Afterwards a stale snapshot is refreshed by exactly one
    /// caller while everyone racing it is served the stale data immediately.
    pub async fn ensure_fresh(&self) -> Option<Arc<Snapshot>> {
        if let Some(current) = self.cache.get_current().await {
            if !self.refresh_due().await {
                return Some(current);
            }
            match self.refresh.try_lock() {
                Ok(_guard) => {
                    // Double-check: the cycle that just released the lock
                    // may already have published a fresh snapshot.
                    if self.refresh_due().await {
                        self.refresh_once().await;
                    }
                }
                // A cycle is in flight; serve stale rather than queueing a
                // duplicate tracker read.
                Err(_) => return Some(current),
            }
            self.cache.get_current().await
        } else {
            let _guard = self.refresh.lock().await;
            if self.cache.get_current().await.is_none() && !self.backoff_holds().await {
                self.refresh_once().await;
            }
            self.cache.get_current().await
        }
    }

    /// Unconditional collection cycle, used by the one-shot output modes.
    pub async fn collect_now(&self) -> Option<Arc<Snapshot>> {
        let _guard = self.refresh.lock().await;
        self.refresh_once().await;
        self.cache.get_current().await
    }

    /// Failure summary of the most recent collection cycle, if any.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub async fn status(&self) -> SchedulerStatus {
        let last_error = self.last_error().await;
        SchedulerStatus {
            state: match self.state().await {
                RefreshState::Idle => "idle".to_string(),
                RefreshState::Fetching => "fetching".to_string(),
            },
            sites: self.sites.len(),
            snapshot_age_secs: self.cache.age().await.map(|age| age.as_secs()),
            degraded: last_error.is_some(),
            last_error,
            consecutive_failures: self.backoff.read().await.consecutive_failures,
        }
    }

    async fn refresh_due(&self) -> bool {
        if self.backoff_holds().await {
            return false;
        }
        match self.cache.age().await {
            None => true,
            Some(age) => age >= self.refresh_interval,
        }
    }

    async fn backoff_holds(&self) -> bool {
        self.backoff.read().await.holds()
    }

    /// One IDLE -> FETCHING -> (PUBLISHED | FAILED) -> IDLE cycle. Callers
    /// must hold the refresh lock; every exit path below releases state and
    /// lock via scope, so a timed-out read can never wedge the scheduler.
    async fn refresh_once(&self) {
        *self.state.write().await = RefreshState::Fetching;
        let timer = self.metrics.start_collection_timer();

        let previous = self.cache.get_current().await;
        let mut samples = Vec::new();
        let mut failures = Vec::new();
        let mut mismatches = 0u64;

        for site in &self.sites {
            match self.fetch_site(site).await {
                Ok(raw) => {
                    let normalized = schema::normalize(&site.name, &raw);
                    if !normalized.mismatches.is_empty() {
                        warn!(
                            site = %site.name,
                            fields = ?normalized.mismatches,
                            "Tracker stats are missing or malformed fields"
                        );
                        mismatches += normalized.mismatches.len() as u64;
                    }
                    if normalized.clamped > 0 {
                        warn!(
                            site = %site.name,
                            clamped = normalized.clamped,
                            "Negative counter values clamped to zero"
                        );
                    }
                    samples.extend(normalized.samples);
                }
                Err(err) => {
                    warn!(site = %site.name, error = %err, "Stats collection failed");
                    self.metrics.record_fetch_error();
                    // Keep serving the site's last known good values.
                    if let Some(previous) = &previous {
                        samples.extend(previous.samples_for_site(&site.name));
                    }
                    failures.push(format!("{}: {}", site.name, err));
                }
            }
        }

        if mismatches > 0 {
            self.metrics.record_schema_mismatches(mismatches);
        }

        let error = if failures.is_empty() {
            None
        } else {
            Some(failures.join("; "))
        };

        if error.is_none() {
            self.metrics.mark_success();
            self.backoff.write().await.on_success();
        } else {
            self.metrics.mark_degraded();
            self.backoff
                .write()
                .await
                .on_failure(self.backoff_initial, self.backoff_max);
        }
        *self.last_error.write().await = error.clone();

        // A cold start where nothing could be read publishes nothing: the
        // exposition side answers "not ready" instead of an empty body.
        let total_cold_failure = error.is_some() && samples.is_empty() && previous.is_none();
        if total_cold_failure {
            debug!("No snapshot published, first collection cycle failed entirely");
        } else {
            let published = self.cache.publish(Snapshot::new(samples, error)).await;
            debug!(
                samples = published.samples.len(),
                degraded = published.is_degraded(),
                "Published snapshot"
            );
        }

        timer.observe_duration();
        *self.state.write().await = RefreshState::Idle;
    }

    /// Hard upper bound on one tracker read, independent of whatever the
    /// source implementation does internally.
    async fn fetch_site(&self, site: &SiteSource) -> Result<RawStats, SourceError> {
        match tokio::time::timeout(self.timeout, site.source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Unavailable(format!(
                "{}: read timed out after {:.1}s",
                site.source.describe(),
                self.timeout.as_secs_f64()
            ))),
        }
    }
}
