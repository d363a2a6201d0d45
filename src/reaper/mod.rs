//! Idle-instance reaping
//!
//! The evaluator turns telemetry into an idle/active verdict, the tracker
//! persists the inactivity watermark across invocations, and the
//! controller combines the two into the stop-and-notify decision.

mod controller;
mod evaluator;
mod tracker;

pub use controller::{ShutdownController, SweepSummary};
pub use evaluator::{DiskBackend, IdleEvaluator, IdleVerdict, MetricsSummary};
pub use tracker::InactivityTracker;
