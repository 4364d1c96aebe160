pub mod http;

pub use http::HttpSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Raw counters as reported by a tracker's status endpoint, untyped until
/// they cross the normalization boundary.
#[derive(Debug, Clone)]
pub struct RawStats {
    values: Map<String, Value>,
    captured_at: DateTime<Utc>,
}

impl RawStats {
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values,
            captured_at: Utc::now(),
        }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Numeric field, if present and actually numeric.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(Value::as_f64)
    }

    /// Nested object field, e.g. the `clients` agent/version map.
    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.values.get(key).and_then(Value::as_object)
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// The tracker could not be reached at all (connect failure, timeout).
    #[error("tracker unreachable: {0}")]
    Unavailable(String),
    /// The tracker answered with something other than the expected stats
    /// document (bad status, non-JSON body, wrong top-level shape).
    #[error("unexpected tracker response: {0}")]
    Protocol(String),
}

/// A readable tracker status channel. Implementations must bound every read
/// with a timeout and must be safe to retry: `fetch` has no side effects on
/// the tracker.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Identity used in logs and error markers, typically the stats URL.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<RawStats, SourceError>;
}
