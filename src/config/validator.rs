use super::Config;
use anyhow::Result;
use std::collections::HashSet;

pub fn validate_config(config: &Config) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if config.server.port < 1024 {
        warnings.push(format!(
            "[!] Port {} requires root privileges. Consider using a port >= 1024",
            config.server.port
        ));
    }

    if config.sites.is_empty() {
        warnings.push("[X] No sites configured. Add at least one [[sites]] entry.".to_string());
    }

    let mut seen = HashSet::new();
    for site in &config.sites {
        if site.name.is_empty() {
            warnings.push("[X] Site with empty name".to_string());
        }
        if !seen.insert(site.name.as_str()) {
            warnings.push(format!("[X] Duplicate site name: {}", site.name));
        }
        if !site.url.starts_with("http://") && !site.url.starts_with("https://") {
            warnings.push(format!(
                "[X] Site '{}' URL must start with http:// or https://: {}",
                site.name, site.url
            ));
        }
    }

    if config.collector.refresh_interval_secs == 0 {
        warnings.push("[!] Refresh interval is 0. Every scrape will hit the tracker.".to_string());
    }

    if config.collector.timeout_secs == 0 {
        warnings.push("[X] Collector timeout cannot be 0".to_string());
    }

    if config.collector.timeout_secs >= config.collector.refresh_interval_secs
        && config.collector.refresh_interval_secs > 0
    {
        warnings.push(format!(
            "[!] Timeout ({}s) is not shorter than the refresh interval ({}s). Slow trackers will stall scrapes.",
            config.collector.timeout_secs, config.collector.refresh_interval_secs
        ));
    }

    if config.collector.backoff_initial_secs > config.collector.backoff_max_secs {
        warnings.push(format!(
            "[X] backoff_initial_secs ({}) is larger than backoff_max_secs ({})",
            config.collector.backoff_initial_secs, config.collector.backoff_max_secs
        ));
    }

    if !["trace", "debug", "info", "warn", "error"].contains(&config.logging.level.as_str()) {
        warnings.push(format!(
            "[X] Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
            config.logging.level
        ));
    }

    if !["json", "pretty", "compact"].contains(&config.logging.format.as_str()) {
        warnings.push(format!(
            "[X] Invalid log format: {}. Must be 'json', 'pretty' or 'compact'",
            config.logging.format
        ));
    }

    if config.logging.level == "debug" || config.logging.level == "trace" {
        warnings.push(
            "[*] Recommendation: Use 'info' or 'warn' log level in production".to_string()
        );
    }

    Ok(warnings)
}
