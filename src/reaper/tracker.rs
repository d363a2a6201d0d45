//! Inactivity watermark tracking
//!
//! A two-state machine per instance, persisted entirely in the tag store
//! so it survives stateless invocations: the `InactivityStart` tag is
//! written the first time an instance is observed idle, never moved while
//! the idle streak continues, and deleted the moment the instance is
//! observed active. Every reconcile also refreshes the advisory
//! `LastActivityCheck` tag.

use crate::attrs::{TAG_INACTIVITY_START, TAG_LAST_CHECK};
use crate::compute::TagStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Tracks per-instance inactivity watermarks in the tag store
pub struct InactivityTracker {
    tags: Arc<dyn TagStore>,
}

impl InactivityTracker {
    /// Create a new tracker over the given tag store.
    pub fn new(tags: Arc<dyn TagStore>) -> Self {
        Self { tags }
    }

    /// Reconcile the watermark with the latest idle verdict and return
    /// the start of the current idle streak, if any.
    ///
    /// Any tag-store failure is logged and treated as "no record" for
    /// this invocation; a transient failure delays idle-duration accrual
    /// by one cycle but never aborts the sweep.
    pub async fn reconcile(&self, instance_id: &str, idle: bool) -> Option<DateTime<Utc>> {
        let started_at = self.latch(instance_id, idle).await;
        self.touch_last_check(instance_id).await;
        started_at
    }

    async fn latch(&self, instance_id: &str, idle: bool) -> Option<DateTime<Utc>> {
        let existing = match self.tags.get_tag(instance_id, TAG_INACTIVITY_START).await {
            Ok(value) => value,
            Err(e) => {
                error!(
                    instance = instance_id,
                    error = %e,
                    "Error reading inactivity watermark",
                );
                return None;
            }
        };

        match (idle, existing) {
            // First idle observation: start the streak now.
            (true, None) => {
                let now = Utc::now();
                if let Err(e) = self
                    .tags
                    .set_tag(instance_id, TAG_INACTIVITY_START, &encode_epoch(now))
                    .await
                {
                    error!(
                        instance = instance_id,
                        error = %e,
                        "Error writing inactivity watermark",
                    );
                    return None;
                }
                info!(instance = instance_id, "Set inactivity start timestamp");
                Some(now)
            }
            // Continuously idle: the start timestamp is never moved.
            (true, Some(raw)) => match parse_epoch(&raw) {
                Some(started_at) => Some(started_at),
                None => {
                    warn!(
                        instance = instance_id,
                        value = %raw,
                        "Unparseable inactivity watermark, ignoring for this cycle",
                    );
                    None
                }
            },
            // Activity resumed: clear the streak.
            (false, Some(_)) => {
                if let Err(e) = self.tags.delete_tag(instance_id, TAG_INACTIVITY_START).await {
                    error!(
                        instance = instance_id,
                        error = %e,
                        "Error clearing inactivity watermark",
                    );
                    return None;
                }
                info!(instance = instance_id, "Cleared inactivity start timestamp");
                None
            }
            (false, None) => None,
        }
    }

    /// Delete the watermark outright. Used when an instance leaves the
    /// running population and the record would otherwise linger stale.
    pub async fn clear(&self, instance_id: &str) -> crate::error::Result<()> {
        self.tags.delete_tag(instance_id, TAG_INACTIVITY_START).await
    }

    /// Refresh the advisory last-check mark. Never read back by logic;
    /// an external auditor can use it to detect stalled evaluation.
    async fn touch_last_check(&self, instance_id: &str) {
        if let Err(e) = self
            .tags
            .set_tag(instance_id, TAG_LAST_CHECK, &encode_epoch(Utc::now()))
            .await
        {
            error!(
                instance = instance_id,
                error = %e,
                "Error updating activity check tag",
            );
        }
    }
}

/// Encode a timestamp as fractional epoch seconds, e.g. `1733000000.250`.
fn encode_epoch(ts: DateTime<Utc>) -> String {
    format!("{:.3}", ts.timestamp_millis() as f64 / 1000.0)
}

/// Parse a fractional epoch-seconds string back into a timestamp.
fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let seconds: f64 = raw.trim().parse().ok()?;
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
}
