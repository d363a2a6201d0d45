//! Trigger event payloads
//!
//! An invocation is driven either by an instance state-change event or by a
//! scheduled sweep. State-change events carry the source below and a detail
//! block naming the instance and its new lifecycle state; any other payload
//! routes to sweep mode.

use serde::{Deserialize, Serialize};

/// Source value carried by instance state-change events.
pub const STATE_CHANGE_SOURCE: &str = "compute.instance-state-change";

/// Lifecycle state value that triggers single-instance processing.
pub const STATE_RUNNING: &str = "running";

/// An invocation trigger payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Event source; absent for manual or scheduled invocations
    #[serde(default)]
    pub source: Option<String>,

    /// State-change detail; absent for scheduled invocations
    #[serde(default)]
    pub detail: Option<StateChangeDetail>,
}

/// Detail block of an instance state-change event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangeDetail {
    /// Instance the state change applies to
    #[serde(rename = "instance-id")]
    pub instance_id: String,

    /// New lifecycle state of the instance
    pub state: String,
}

impl TriggerEvent {
    /// Parse a trigger payload from JSON.
    pub fn from_json(raw: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// The state-change detail, when this payload is a well-formed
    /// instance state-change event.
    pub fn state_change(&self) -> Option<&StateChangeDetail> {
        match self.source.as_deref() {
            Some(STATE_CHANGE_SOURCE) => self.detail.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state_change_event() {
        let json = r#"{
            "source": "compute.instance-state-change",
            "detail": {
                "instance-id": "i-0abc123",
                "state": "running"
            }
        }"#;

        let event = TriggerEvent::from_json(json).unwrap();
        let detail = event.state_change().expect("state-change detail");
        assert_eq!(detail.instance_id, "i-0abc123");
        assert_eq!(detail.state, STATE_RUNNING);
    }

    #[test]
    fn test_other_source_routes_to_sweep() {
        let json = r#"{"source": "scheduler.timer"}"#;
        let event = TriggerEvent::from_json(json).unwrap();
        assert!(event.state_change().is_none());
    }

    #[test]
    fn test_empty_payload_routes_to_sweep() {
        let event = TriggerEvent::from_json("{}").unwrap();
        assert!(event.state_change().is_none());
    }

    #[test]
    fn test_state_change_source_without_detail() {
        let json = r#"{"source": "compute.instance-state-change"}"#;
        let event = TriggerEvent::from_json(json).unwrap();
        assert!(event.state_change().is_none());
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(TriggerEvent::from_json("not json").is_err());
    }
}
