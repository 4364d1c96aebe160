use crate::schema::MetricSample;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// One published view of all tracker metrics. Immutable after publication:
/// refreshes build a new snapshot, they never touch an existing one.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub samples: Vec<MetricSample>,
    pub captured_at: DateTime<Utc>,
    /// Set when the refresh that produced this snapshot had failures; the
    /// samples of the affected sites are carried over from the previous
    /// snapshot instead of being dropped.
    pub error: Option<String>,
}

impl Snapshot {
    pub fn new(samples: Vec<MetricSample>, error: Option<String>) -> Self {
        Self {
            samples,
            captured_at: Utc::now(),
            error,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// Samples belonging to one site, used to carry last-known-good data
    /// across a failed refresh of that site.
    pub fn samples_for_site(&self, site: &str) -> Vec<MetricSample> {
        self.samples
            .iter()
            .filter(|s| s.site == site)
            .cloned()
            .collect()
    }
}

struct Published {
    snapshot: Arc<Snapshot>,
    published_at: Instant,
}

/// Holds the current snapshot. Reads are lock-clone-release: no reader ever
/// holds the lock across I/O, and every reader observes a fully published
/// snapshot or none at all.
pub struct SnapshotCache {
    current: RwLock<Option<Published>>,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// The last published snapshot, stale or not. Never performs I/O.
    pub async fn get_current(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.as_ref().map(|p| p.snapshot.clone())
    }

    /// Atomically replaces the current snapshot.
    pub async fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let mut current = self.current.write().await;
        *current = Some(Published {
            snapshot: snapshot.clone(),
            published_at: Instant::now(),
        });
        snapshot
    }

    /// Time since the last publish, `None` before the first one.
    pub async fn age(&self) -> Option<Duration> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|p| p.published_at.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MetricKind;

    fn uniform_snapshot(value: f64) -> Snapshot {
        let samples = ["bttrack_torrents", "bttrack_peers_all"]
            .into_iter()
            .map(|name| MetricSample {
                name,
                help: "",
                kind: MetricKind::Gauge,
                site: "example".to_string(),
                value,
            })
            .collect();
        Snapshot::new(samples, None)
    }

    #[tokio::test]
    async fn test_empty_cache_returns_none() {
        let cache = SnapshotCache::new();
        assert!(cache.get_current().await.is_none());
        assert!(cache.age().await.is_none());
    }

    #[tokio::test]
    async fn test_publish_supersedes_previous_snapshot() {
        let cache = SnapshotCache::new();

        cache.publish(uniform_snapshot(1.0)).await;
        let first = cache.get_current().await.unwrap();
        assert_eq!(first.samples[0].value, 1.0);

        cache.publish(uniform_snapshot(2.0)).await;
        let second = cache.get_current().await.unwrap();
        assert_eq!(second.samples[0].value, 2.0);

        // The superseded snapshot is untouched for readers still holding it.
        assert_eq!(first.samples[0].value, 1.0);
    }

    #[tokio::test]
    async fn test_readers_never_observe_a_torn_snapshot() {
        let cache = Arc::new(SnapshotCache::new());
        cache.publish(uniform_snapshot(1.0)).await;

        let mut readers = Vec::new();
        for _ in 0..32 {
            let cache = cache.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let snapshot = cache.get_current().await.unwrap();
                    let first = snapshot.samples[0].value;
                    // Every sample in one snapshot comes from the same
                    // publish; mixed values would mean a torn read.
                    assert!(snapshot.samples.iter().all(|s| s.value == first));
                }
            }));
        }

        let writer = {
            let cache = cache.clone();
            tokio::spawn(async move {
                for i in 2..100u32 {
                    cache.publish(uniform_snapshot(f64::from(i))).await;
                }
            })
        };

        for reader in readers {
            reader.await.unwrap();
        }
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_samples_for_site_filters_by_label() {
        let mut samples = uniform_snapshot(1.0).samples;
        samples.push(MetricSample {
            name: "bttrack_torrents",
            help: "",
            kind: MetricKind::Gauge,
            site: "other".to_string(),
            value: 9.0,
        });
        let snapshot = Snapshot::new(samples, None);

        let other = snapshot.samples_for_site("other");
        assert_eq!(other.len(), 1);
        assert_eq!(other[0].value, 9.0);
        assert_eq!(snapshot.samples_for_site("example").len(), 2);
    }
}
