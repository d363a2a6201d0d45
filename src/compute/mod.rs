//! Compute platform boundary
//!
//! Wire types for instances and metric samples, and the collaborator
//! traits the reaper is written against. Production code talks to the
//! platform through [`HttpComputeClient`]; tests substitute in-memory
//! fakes implementing the same traits.

mod http;

pub use http::HttpComputeClient;

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle state of a compute instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    Running,
    Stopped,
    /// Any other lifecycle state (starting, stopping, terminated, ...)
    #[serde(other)]
    Other,
}

/// A compute instance as reported by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Platform-assigned instance identifier
    pub id: String,

    /// Current lifecycle state
    pub state: InstanceState,

    /// Opaque key/value attributes attached to the instance
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// One time-windowed averaged metric sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    /// Start of the sampling period
    pub timestamp: DateTime<Utc>,

    /// Average value over the sampling period
    pub average: f64,
}

/// Read access to averaged utilization samples for a named instance and
/// signal over a time range.
#[async_trait::async_trait]
pub trait MetricsGateway: Send + Sync {
    /// Query averaged samples for one signal. The result is finite and
    /// may be empty.
    async fn query(
        &self,
        instance_id: &str,
        signal: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        period_seconds: i64,
    ) -> Result<Vec<Datapoint>>;
}

/// Durable per-instance key/value attributes.
#[async_trait::async_trait]
pub trait TagStore: Send + Sync {
    async fn get_tag(&self, instance_id: &str, key: &str) -> Result<Option<String>>;

    async fn set_tag(&self, instance_id: &str, key: &str, value: &str) -> Result<()>;

    async fn delete_tag(&self, instance_id: &str, key: &str) -> Result<()>;
}

/// Enumeration and lookup of compute instances.
#[async_trait::async_trait]
pub trait InstanceDirectory: Send + Sync {
    /// All instances currently in the running state.
    async fn list_running(&self) -> Result<Vec<Instance>>;

    /// Look up one instance by id.
    async fn describe(&self, instance_id: &str) -> Result<Option<Instance>>;
}

/// Fire-and-forget request to transition an instance to stopped.
#[async_trait::async_trait]
pub trait StopAction: Send + Sync {
    async fn stop(&self, instance_id: &str) -> Result<()>;
}
