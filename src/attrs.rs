//! Well-known instance tags and metric signal names
//!
//! Provides the tag keys this service reads and writes on compute
//! instances, the metric names it queries, and small helpers for
//! interpreting instance tags.

use crate::compute::Instance;

// Tag keys read from instances
pub const TAG_SHUTDOWN_ENABLED: &str = "AutoShutdownEnabled";
pub const TAG_NAME: &str = "Name";

// Tag keys written by this service
pub const TAG_INACTIVITY_START: &str = "InactivityStart";
pub const TAG_LAST_CHECK: &str = "LastActivityCheck";

// Metric signal names, averaged per sampling period
pub const METRIC_CPU: &str = "cpu_utilization";
pub const METRIC_NETWORK_IN: &str = "network_in_bytes";
pub const METRIC_NETWORK_OUT: &str = "network_out_bytes";
pub const METRIC_VOLUME_READ: &str = "volume_read_bytes";
pub const METRIC_VOLUME_WRITE: &str = "volume_write_bytes";
pub const METRIC_DISK_READ: &str = "disk_read_bytes";
pub const METRIC_DISK_WRITE: &str = "disk_write_bytes";

/// Sentinel display name for instances without a `Name` tag.
pub const UNNAMED_INSTANCE: &str = "unknown";

/// Whether the instance has opted into automatic shutdown.
///
/// The tag value is compared case-insensitively, so `True` and `TRUE`
/// opt in as well.
pub fn shutdown_enabled(instance: &Instance) -> bool {
    instance
        .tags
        .get(TAG_SHUTDOWN_ENABLED)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Resolve the human-readable instance name from the `Name` tag.
pub fn display_name(instance: &Instance) -> String {
    instance
        .tags
        .get(TAG_NAME)
        .cloned()
        .unwrap_or_else(|| UNNAMED_INSTANCE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::InstanceState;
    use std::collections::BTreeMap;

    fn instance_with_tags(pairs: &[(&str, &str)]) -> Instance {
        let tags: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Instance {
            id: "i-0abc".to_string(),
            state: InstanceState::Running,
            tags,
        }
    }

    #[test]
    fn test_shutdown_enabled_true() {
        let instance = instance_with_tags(&[(TAG_SHUTDOWN_ENABLED, "true")]);
        assert!(shutdown_enabled(&instance));
    }

    #[test]
    fn test_shutdown_enabled_case_insensitive() {
        let instance = instance_with_tags(&[(TAG_SHUTDOWN_ENABLED, "True")]);
        assert!(shutdown_enabled(&instance));
    }

    #[test]
    fn test_shutdown_enabled_false_value() {
        let instance = instance_with_tags(&[(TAG_SHUTDOWN_ENABLED, "false")]);
        assert!(!shutdown_enabled(&instance));
    }

    #[test]
    fn test_shutdown_enabled_absent() {
        let instance = instance_with_tags(&[]);
        assert!(!shutdown_enabled(&instance));
    }

    #[test]
    fn test_display_name() {
        let instance = instance_with_tags(&[(TAG_NAME, "build-agent-7")]);
        assert_eq!(display_name(&instance), "build-agent-7");
    }

    #[test]
    fn test_display_name_fallback() {
        let instance = instance_with_tags(&[]);
        assert_eq!(display_name(&instance), UNNAMED_INSTANCE);
    }
}
