//! Idle evaluation over utilization telemetry
//!
//! Combines processor, network, and disk signals into a single idle/active
//! verdict using independent per-signal thresholds. Fails closed: when the
//! metrics gateway cannot be read at all, the instance is treated as
//! active rather than blocking the sweep.

use crate::attrs::{
    METRIC_CPU, METRIC_DISK_READ, METRIC_DISK_WRITE, METRIC_NETWORK_IN, METRIC_NETWORK_OUT,
    METRIC_VOLUME_READ, METRIC_VOLUME_WRITE,
};
use crate::compute::{Datapoint, MetricsGateway};
use crate::config::ReaperConfig;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome of one idle evaluation
#[derive(Debug, Clone)]
pub struct IdleVerdict {
    /// Overall verdict: all signal classes below their thresholds
    pub idle: bool,

    /// Processor class verdict
    pub cpu_idle: bool,

    /// Network class verdict (inbound and outbound combined)
    pub network_idle: bool,

    /// Disk class verdict for the detected backend family
    pub disk_idle: bool,

    /// Number of processor and network samples in the window
    pub sample_count: usize,
}

impl IdleVerdict {
    /// Verdict used when metrics could not be retrieved at all.
    fn inconclusive() -> Self {
        Self {
            idle: false,
            cpu_idle: false,
            network_idle: false,
            disk_idle: false,
            sample_count: 0,
        }
    }
}

/// Disk backend detected from metric availability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskBackend {
    /// Network-attached block volumes
    Volume,
    /// Instance-local disk
    Local,
    /// No disk metrics reported
    None,
    /// Summary lookup failed
    Unknown,
}

impl fmt::Display for DiskBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskBackend::Volume => write!(f, "Block volume"),
            DiskBackend::Local => write!(f, "Local disk"),
            DiskBackend::None => write!(f, "None"),
            DiskBackend::Unknown => write!(f, "N/A"),
        }
    }
}

/// Averaged utilization figures attached to shutdown notifications
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    /// Mean processor utilization over the summary window (percent)
    pub cpu_avg: Option<f64>,

    /// Mean network throughput over the summary window (bytes per period)
    pub network_avg: Option<f64>,

    /// Detected disk backend
    pub disk_backend: DiskBackend,
}

impl MetricsSummary {
    fn unknown() -> Self {
        Self {
            cpu_avg: None,
            network_avg: None,
            disk_backend: DiskBackend::Unknown,
        }
    }
}

/// Evaluates instance idleness from averaged telemetry
pub struct IdleEvaluator {
    metrics: Arc<dyn MetricsGateway>,
    config: ReaperConfig,
}

impl IdleEvaluator {
    /// Create a new evaluator over the given metrics gateway.
    pub fn new(metrics: Arc<dyn MetricsGateway>, config: ReaperConfig) -> Self {
        Self { metrics, config }
    }

    /// Evaluate whether an instance is currently idle.
    pub async fn evaluate(&self, instance_id: &str) -> IdleVerdict {
        match self.evaluate_inner(instance_id).await {
            Ok(verdict) => {
                debug!(
                    instance = instance_id,
                    cpu = verdict.cpu_idle,
                    network = verdict.network_idle,
                    disk = verdict.disk_idle,
                    idle = verdict.idle,
                    "Idle check complete",
                );
                verdict
            }
            Err(e) => {
                error!(
                    instance = instance_id,
                    error = %e,
                    "Error checking metrics, treating instance as active",
                );
                IdleVerdict::inconclusive()
            }
        }
    }

    async fn evaluate_inner(&self, instance_id: &str) -> Result<IdleVerdict> {
        let (start, end) = self.window();
        let period = self.config.metric_period_seconds;

        let cpu = self
            .metrics
            .query(instance_id, METRIC_CPU, start, end, period)
            .await?;
        let network_in = self
            .metrics
            .query(instance_id, METRIC_NETWORK_IN, start, end, period)
            .await?;
        let network_out = self
            .metrics
            .query(instance_id, METRIC_NETWORK_OUT, start, end, period)
            .await?;

        // The two disk families represent mutually exclusive storage
        // backends and are never pooled into one check.
        let mut volume = self
            .metrics
            .query(instance_id, METRIC_VOLUME_READ, start, end, period)
            .await?;
        volume.extend(
            self.metrics
                .query(instance_id, METRIC_VOLUME_WRITE, start, end, period)
                .await?,
        );
        let mut local = self
            .metrics
            .query(instance_id, METRIC_DISK_READ, start, end, period)
            .await?;
        local.extend(
            self.metrics
                .query(instance_id, METRIC_DISK_WRITE, start, end, period)
                .await?,
        );

        let cpu_idle = all_below(&cpu, self.config.cpu_threshold);
        let network_idle = all_below(&network_in, self.config.network_threshold)
            && all_below(&network_out, self.config.network_threshold);

        let disk_idle = if !volume.is_empty() {
            debug!(instance = instance_id, "Using block-volume metrics for disk check");
            all_below(&volume, self.config.disk_threshold)
        } else if !local.is_empty() {
            debug!(instance = instance_id, "Using local-disk metrics for disk check");
            all_below(&local, self.config.disk_threshold)
        } else {
            debug!(instance = instance_id, "No disk metrics available, skipping disk check");
            true
        };

        // Processor and network are required signal classes; without any
        // samples from them no determination can be made.
        let sample_count = cpu.len() + network_in.len() + network_out.len();
        if sample_count == 0 {
            warn!(
                instance = instance_id,
                "No metric data available, considering instance as active",
            );
            return Ok(IdleVerdict {
                idle: false,
                cpu_idle,
                network_idle,
                disk_idle,
                sample_count,
            });
        }

        Ok(IdleVerdict {
            idle: cpu_idle && network_idle && disk_idle,
            cpu_idle,
            network_idle,
            disk_idle,
            sample_count,
        })
    }

    /// Fetch the averaged figures quoted in shutdown notifications.
    ///
    /// Computed independently of [`evaluate`](Self::evaluate); a failure
    /// here degrades the notification, never the shutdown decision.
    pub async fn summarize(&self, instance_id: &str) -> MetricsSummary {
        match self.summarize_inner(instance_id).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(
                    instance = instance_id,
                    error = %e,
                    "Error getting metrics for notification",
                );
                MetricsSummary::unknown()
            }
        }
    }

    async fn summarize_inner(&self, instance_id: &str) -> Result<MetricsSummary> {
        let (start, end) = self.window();
        let period = self.config.metric_period_seconds;

        let cpu = self
            .metrics
            .query(instance_id, METRIC_CPU, start, end, period)
            .await?;
        let mut network = self
            .metrics
            .query(instance_id, METRIC_NETWORK_IN, start, end, period)
            .await?;
        network.extend(
            self.metrics
                .query(instance_id, METRIC_NETWORK_OUT, start, end, period)
                .await?,
        );

        let volume_read = self
            .metrics
            .query(instance_id, METRIC_VOLUME_READ, start, end, period)
            .await?;
        let disk_read = self
            .metrics
            .query(instance_id, METRIC_DISK_READ, start, end, period)
            .await?;

        let disk_backend = if !volume_read.is_empty() {
            DiskBackend::Volume
        } else if !disk_read.is_empty() {
            DiskBackend::Local
        } else {
            DiskBackend::None
        };

        Ok(MetricsSummary {
            cpu_avg: mean(&cpu),
            network_avg: mean(&network),
            disk_backend,
        })
    }

    fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = Utc::now();
        let start = end - Duration::seconds((self.config.inactivity_hours * 3600.0) as i64);
        (start, end)
    }
}

/// A signal class is idle iff every sample is strictly below the
/// threshold; an empty series is vacuously idle.
fn all_below(samples: &[Datapoint], threshold: f64) -> bool {
    samples.iter().all(|dp| dp.average < threshold)
}

fn mean(samples: &[Datapoint]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().map(|dp| dp.average).sum::<f64>() / samples.len() as f64)
}
