use super::{RawStats, SourceError, StatsSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Reads a tracker's `stats.json` status page over HTTP.
pub struct HttpSource {
    client: reqwest::Client,
    stats_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            stats_url: format!("{}/stats.json", base_url.trim_end_matches('/')),
        })
    }

    fn classify(&self, err: reqwest::Error) -> SourceError {
        if err.is_decode() {
            SourceError::Protocol(format!("{}: {}", self.stats_url, err))
        } else {
            SourceError::Unavailable(format!("{}: {}", self.stats_url, err))
        }
    }
}

#[async_trait]
impl StatsSource for HttpSource {
    fn describe(&self) -> String {
        self.stats_url.clone()
    }

    async fn fetch(&self) -> Result<RawStats, SourceError> {
        debug!("Fetching {}", self.stats_url);

        let response = self
            .client
            .get(&self.stats_url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Protocol(format!(
                "HTTP {} from {}",
                status.as_u16(),
                self.stats_url
            )));
        }

        let body: Value = response.json().await.map_err(|e| self.classify(e))?;

        match body {
            Value::Object(values) => Ok(RawStats::new(values)),
            other => Err(SourceError::Protocol(format!(
                "{}: expected a JSON object, got {}",
                self.stats_url,
                json_type_name(&other)
            ))),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
