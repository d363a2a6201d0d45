//! Runtime configuration
//!
//! All tunables are read from the environment at startup. Every threshold
//! has a default; a value that is present but malformed is fatal, so the
//! service refuses to run with unusable thresholds.

use crate::error::{ReaperError, Result};

/// Configuration for idle evaluation and shutdown
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Processor utilization threshold (percent)
    pub cpu_threshold: f64,

    /// Network throughput threshold (bytes per sampling period)
    pub network_threshold: f64,

    /// Disk throughput threshold (bytes per sampling period)
    pub disk_threshold: f64,

    /// Hours of continuous idleness before an instance is stopped
    pub inactivity_hours: f64,

    /// Metric sampling period (seconds)
    pub metric_period_seconds: i64,

    /// Base URL of the compute platform API
    pub api_url: String,

    /// Bearer token for the compute platform API
    pub api_token: Option<String>,

    /// Webhook endpoints for shutdown notifications (may be empty)
    pub webhook_urls: Vec<String>,
}

fn default_cpu_threshold() -> f64 {
    10.0
}

fn default_network_threshold() -> f64 {
    100_000.0
}

fn default_disk_threshold() -> f64 {
    1_000_000.0
}

fn default_inactivity_hours() -> f64 {
    3.0
}

fn default_metric_period_seconds() -> i64 {
    300
}

impl ReaperConfig {
    /// Load the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            cpu_threshold: parse_or(&lookup, "CPU_THRESHOLD", default_cpu_threshold())?,
            network_threshold: parse_or(&lookup, "NETWORK_THRESHOLD", default_network_threshold())?,
            disk_threshold: parse_or(&lookup, "DISK_THRESHOLD", default_disk_threshold())?,
            inactivity_hours: parse_or(&lookup, "INACTIVITY_HOURS", default_inactivity_hours())?,
            metric_period_seconds: parse_or(
                &lookup,
                "METRIC_PERIOD",
                default_metric_period_seconds(),
            )?,
            api_url: lookup("COMPUTE_API_URL").ok_or_else(|| {
                ReaperError::Configuration("COMPUTE_API_URL is not set".to_string())
            })?,
            api_token: lookup("COMPUTE_API_TOKEN"),
            webhook_urls: parse_webhook_urls(&lookup)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.inactivity_hours <= 0.0 {
            return Err(ReaperError::Configuration(format!(
                "INACTIVITY_HOURS must be positive, got {}",
                self.inactivity_hours
            )));
        }
        if self.metric_period_seconds <= 0 {
            return Err(ReaperError::Configuration(format!(
                "METRIC_PERIOD must be positive, got {}",
                self.metric_period_seconds
            )));
        }
        Ok(())
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ReaperError::Configuration(format!("{} has a malformed value: {:?}", key, raw))
        }),
        None => Ok(default),
    }
}

/// The webhook list is a JSON array of URLs, e.g. `["https://...", ...]`.
fn parse_webhook_urls<F>(lookup: &F) -> Result<Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup("WEBHOOK_URLS") {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| {
            ReaperError::Configuration(format!("WEBHOOK_URLS is not a JSON list of URLs: {}", e))
        }),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let lookup = lookup_from(&[("COMPUTE_API_URL", "http://localhost:8405")]);
        let config = ReaperConfig::from_lookup(lookup).unwrap();

        assert_eq!(config.cpu_threshold, 10.0);
        assert_eq!(config.network_threshold, 100_000.0);
        assert_eq!(config.disk_threshold, 1_000_000.0);
        assert_eq!(config.inactivity_hours, 3.0);
        assert_eq!(config.metric_period_seconds, 300);
        assert!(config.api_token.is_none());
        assert!(config.webhook_urls.is_empty());
    }

    #[test]
    fn test_custom_values() {
        let lookup = lookup_from(&[
            ("COMPUTE_API_URL", "https://compute.internal"),
            ("COMPUTE_API_TOKEN", "secret"),
            ("CPU_THRESHOLD", "5"),
            ("NETWORK_THRESHOLD", "50000"),
            ("DISK_THRESHOLD", "250000"),
            ("INACTIVITY_HOURS", "1.5"),
            ("METRIC_PERIOD", "60"),
            ("WEBHOOK_URLS", r#"["https://hooks.example.com/a", "https://hooks.example.com/b"]"#),
        ]);
        let config = ReaperConfig::from_lookup(lookup).unwrap();

        assert_eq!(config.cpu_threshold, 5.0);
        assert_eq!(config.inactivity_hours, 1.5);
        assert_eq!(config.metric_period_seconds, 60);
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.webhook_urls.len(), 2);
    }

    #[test]
    fn test_malformed_number_is_fatal() {
        let lookup = lookup_from(&[
            ("COMPUTE_API_URL", "http://localhost:8405"),
            ("CPU_THRESHOLD", "ten percent"),
        ]);
        let err = ReaperConfig::from_lookup(lookup).unwrap_err();
        assert!(matches!(err, ReaperError::Configuration(_)));
        assert!(err.to_string().contains("CPU_THRESHOLD"));
    }

    #[test]
    fn test_malformed_webhook_list_is_fatal() {
        let lookup = lookup_from(&[
            ("COMPUTE_API_URL", "http://localhost:8405"),
            ("WEBHOOK_URLS", "https://not-a-json-list"),
        ]);
        let err = ReaperConfig::from_lookup(lookup).unwrap_err();
        assert!(matches!(err, ReaperError::Configuration(_)));
    }

    #[test]
    fn test_missing_api_url_is_fatal() {
        let err = ReaperConfig::from_lookup(|_| None).unwrap_err();
        assert!(err.to_string().contains("COMPUTE_API_URL"));
    }

    #[test]
    fn test_nonpositive_inactivity_hours_rejected() {
        let lookup = lookup_from(&[
            ("COMPUTE_API_URL", "http://localhost:8405"),
            ("INACTIVITY_HOURS", "0"),
        ]);
        let err = ReaperConfig::from_lookup(lookup).unwrap_err();
        assert!(err.to_string().contains("INACTIVITY_HOURS"));
    }
}
