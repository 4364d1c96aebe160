use crate::config::Config;
use crate::exposition::{self, AppState};
use crate::metrics::SelfMetrics;
use crate::scheduler::{RefreshScheduler, SiteSource};
use crate::snapshot::SnapshotCache;
use crate::source::HttpSource;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;

/// Wires configuration into sources, scheduler and exposition endpoint.
pub struct Exporter {
    config: Arc<Config>,
    scheduler: Arc<RefreshScheduler>,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("sites", &self.config.sites.len())
            .finish_non_exhaustive()
    }
}

impl Exporter {
    pub fn new(config: Config) -> Result<Self> {
        if config.sites.is_empty() {
            bail!("No sites configured. Add at least one [[sites]] entry.");
        }

        // Duplicate names would produce colliding (metric, site) identities.
        let mut names = std::collections::HashSet::new();
        for site in &config.sites {
            if !names.insert(site.name.as_str()) {
                bail!("Duplicate site name: {}", site.name);
            }
        }

        let timeout = config.collector.timeout();
        let mut sites = Vec::with_capacity(config.sites.len());
        for site in &config.sites {
            let source = HttpSource::new(&site.url, timeout)
                .with_context(|| format!("Failed to set up source for site '{}'", site.name))?;
            sites.push(SiteSource {
                name: site.name.clone(),
                source: Arc::new(source),
            });
        }

        let metrics = SelfMetrics::new().context("Failed to register exporter metrics")?;
        let scheduler = Arc::new(RefreshScheduler::new(
            sites,
            SnapshotCache::new(),
            metrics,
            &config.collector,
        ));

        info!("Collecting from {} site(s)", config.sites.len());

        Ok(Self {
            config: Arc::new(config),
            scheduler,
        })
    }

    pub fn scheduler(&self) -> Arc<RefreshScheduler> {
        self.scheduler.clone()
    }

    /// Runs the exposition endpoint until shutdown.
    pub async fn serve(&self) -> Result<()> {
        let state = Arc::new(AppState {
            scheduler: self.scheduler.clone(),
        });
        exposition::serve(&self.config.listen_addr(), state).await
    }

    /// One-shot collection rendered to exposition text. Unlike the daemon
    /// path, any site failure is fatal: one-shot output must not silently
    /// carry stale or empty data.
    pub async fn collect_to_string(&self) -> Result<String> {
        let snapshot = match self.scheduler.collect_now().await {
            Some(snapshot) => snapshot,
            None => {
                let detail = self
                    .scheduler
                    .last_error()
                    .await
                    .unwrap_or_else(|| "no site could be read".to_string());
                bail!("Collection failed: {}", detail);
            }
        };

        if let Some(error) = &snapshot.error {
            bail!("Collection failed: {}", error);
        }

        exposition::render::render(Some(&snapshot), self.scheduler.metrics().registry())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tokio::net::TcpListener;

    async fn spawn_stats_server(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let router = Router::new().route("/stats.json", get(move || async move { body }));
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_empty_sites_are_rejected() {
        let config: Config = toml::from_str("").unwrap();
        assert!(Exporter::new(config).is_err());
    }

    #[test]
    fn test_duplicate_site_names_are_rejected() {
        let config: Config = toml::from_str(
            r#"
[[sites]]
name = "example"
url = "https://a.example.com"

[[sites]]
name = "example"
url = "https://b.example.com"
"#,
        )
        .unwrap();

        let err = Exporter::new(config).unwrap_err();
        assert!(err.to_string().contains("Duplicate site name"));
    }

    #[tokio::test]
    async fn test_one_shot_collection_renders_exposition_text() {
        let url = spawn_stats_server(r#"{"torrents": 10, "peersAll": 42}"#).await;
        let exporter = Exporter::new(Config::for_single_site(&url)).unwrap();

        let text = exporter.collect_to_string().await.unwrap();

        assert!(text.contains("bttrack_torrents{site=\"default\"} 10"));
        assert!(text.contains("bttrack_peers_all{site=\"default\"} 42"));
        assert!(text.contains("bttrack_last_collection_success 1"));
    }

    #[tokio::test]
    async fn test_one_shot_collection_fails_on_unreachable_tracker() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let exporter =
            Exporter::new(Config::for_single_site(&format!("http://{}", addr))).unwrap();

        let err = exporter.collect_to_string().await.unwrap_err();
        assert!(err.to_string().contains("Collection failed"));
    }
}
