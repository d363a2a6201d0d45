//! Shutdown Controller
//!
//! Drives one instance through evaluation per invocation: opt-in gate,
//! idle evaluation, watermark reconciliation, and the stop + notify step
//! once the accumulated idle duration crosses the configured limit. Also
//! owns sweep mode and trigger-event routing.

use crate::attrs;
use crate::compute::{Instance, InstanceDirectory, InstanceState, StopAction};
use crate::config::ReaperConfig;
use crate::error::Result;
use crate::event::{TriggerEvent, STATE_RUNNING};
use crate::notify::{NotificationRelay, ShutdownEvent};
use crate::reaper::{IdleEvaluator, InactivityTracker};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of one sweep over the running population
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    /// Running instances enumerated
    pub examined: usize,

    /// Instances that were in scope and fully evaluated
    pub handled: usize,
}

/// Controller for automatic idle-instance shutdown
pub struct ShutdownController {
    directory: Arc<dyn InstanceDirectory>,
    stopper: Arc<dyn StopAction>,
    relay: Arc<dyn NotificationRelay>,
    evaluator: IdleEvaluator,
    tracker: InactivityTracker,
    config: ReaperConfig,
}

impl ShutdownController {
    /// Create a new shutdown controller over the injected collaborators.
    pub fn new(
        directory: Arc<dyn InstanceDirectory>,
        stopper: Arc<dyn StopAction>,
        relay: Arc<dyn NotificationRelay>,
        evaluator: IdleEvaluator,
        tracker: InactivityTracker,
        config: ReaperConfig,
    ) -> Self {
        Self {
            directory,
            stopper,
            relay,
            evaluator,
            tracker,
            config,
        }
    }

    /// Route a trigger payload: a running-state change processes that one
    /// instance, anything else sweeps the whole running population.
    pub async fn handle_event(&self, event: &TriggerEvent) -> Result<Option<SweepSummary>> {
        if let Some(detail) = event.state_change() {
            if detail.state == STATE_RUNNING {
                info!(
                    instance = %detail.instance_id,
                    "Processing instance state-change event",
                );
                self.process_single(&detail.instance_id).await;
            } else {
                info!(
                    instance = %detail.instance_id,
                    state = %detail.state,
                    "Ignoring state change",
                );
            }
            return Ok(None);
        }

        info!("Processing scheduled check for all instances");
        self.sweep().await.map(Some)
    }

    /// Evaluate every currently-running instance independently; one
    /// instance's failure never prevents processing the rest. A failure
    /// to enumerate the population propagates.
    pub async fn sweep(&self) -> Result<SweepSummary> {
        let instances = self.directory.list_running().await.map_err(|e| {
            error!(error = %e, "Error retrieving running instances");
            e
        })?;

        let examined = instances.len();
        let mut handled = 0;
        for instance in &instances {
            if self.process(instance).await {
                handled += 1;
            }
        }

        info!("Processed {} out of {} running instances", handled, examined);
        Ok(SweepSummary { examined, handled })
    }

    /// Process one instance by id, as driven by a state-change trigger.
    /// Lookup failures are logged, never raised.
    pub async fn process_single(&self, instance_id: &str) {
        match self.directory.describe(instance_id).await {
            Ok(Some(instance)) if instance.state == InstanceState::Running => {
                self.process(&instance).await;
                info!(instance = instance_id, "Processed newly running instance");
            }
            Ok(Some(_)) => {
                info!(
                    instance = instance_id,
                    "Instance is not in running state, skipping",
                );
            }
            Ok(None) => {
                warn!(instance = instance_id, "Instance not found");
            }
            Err(e) => {
                error!(
                    instance = instance_id,
                    error = %e,
                    "Error processing instance",
                );
            }
        }
    }

    /// Evaluate one instance and stop it when it has been idle past the
    /// configured limit. Returns whether the instance was in scope and
    /// fully evaluated; errors during the shutdown step are logged and
    /// yield `false` rather than raising.
    pub async fn process(&self, instance: &Instance) -> bool {
        let instance_id = instance.id.as_str();

        if !attrs::shutdown_enabled(instance) {
            debug!(instance = instance_id, "Auto shutdown not enabled");
            return false;
        }

        info!(instance = instance_id, "Processing instance with auto shutdown enabled");

        let verdict = self.evaluator.evaluate(instance_id).await;
        let started_at = self.tracker.reconcile(instance_id, verdict.idle).await;

        if verdict.idle {
            if let Some(started_at) = started_at {
                let idle_hours =
                    (Utc::now() - started_at).num_milliseconds() as f64 / 3_600_000.0;
                if idle_hours >= self.config.inactivity_hours {
                    return self.shutdown(instance, idle_hours).await;
                }
            }
        }

        true
    }

    async fn shutdown(&self, instance: &Instance, idle_hours: f64) -> bool {
        let instance_id = instance.id.as_str();
        info!(
            instance = instance_id,
            idle_hours,
            "Stopping instance after inactivity",
        );

        let instance_name = attrs::display_name(instance);
        let summary = self.evaluator.summarize(instance_id).await;

        if let Err(e) = self.stopper.stop(instance_id).await {
            error!(instance = instance_id, error = %e, "Error stopping instance");
            return false;
        }

        // The instance is leaving the running population; a lingering
        // watermark would be stale.
        if let Err(e) = self.tracker.clear(instance_id).await {
            error!(
                instance = instance_id,
                error = %e,
                "Error clearing inactivity watermark after stop",
            );
            return false;
        }

        let event = ShutdownEvent {
            instance_id: instance_id.to_string(),
            instance_name,
            idle_hours,
            cpu_avg: summary.cpu_avg,
            network_avg: summary.network_avg,
            disk_backend: summary.disk_backend.to_string(),
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        };
        self.relay.publish(&event).await;

        true
    }
}
