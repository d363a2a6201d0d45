//! idlestop
//!
//! Automated shutdown of idle compute instances. The service inspects
//! running instances, combines processor, network, and disk telemetry
//! into an idle verdict, tracks how long each instance has been idle via
//! a watermark tag on the instance itself, and stops instances that stay
//! idle past a configured limit, posting a notification card to any
//! configured webhooks.
//!
//! ## Opting in
//!
//! Only instances tagged `AutoShutdownEnabled=true` are ever touched:
//!
//! ```text
//! AutoShutdownEnabled = "true"
//! Name                = "ci-runner-7"      # quoted in notifications
//! ```
//!
//! The service writes two tags of its own: `InactivityStart` (the idle
//! streak watermark) and `LastActivityCheck` (advisory, refreshed on
//! every evaluation).

pub mod attrs;
pub mod compute;
pub mod config;
pub mod error;
pub mod event;
pub mod notify;
pub mod reaper;

pub use compute::{
    Datapoint, HttpComputeClient, Instance, InstanceDirectory, InstanceState, MetricsGateway,
    StopAction, TagStore,
};
pub use config::ReaperConfig;
pub use error::{ReaperError, Result};
pub use event::{StateChangeDetail, TriggerEvent};
pub use notify::{NotificationRelay, ShutdownEvent, WebhookRelay};
pub use reaper::{
    DiskBackend, IdleEvaluator, IdleVerdict, InactivityTracker, MetricsSummary,
    ShutdownController, SweepSummary,
};
