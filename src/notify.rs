//! Shutdown notifications
//!
//! Relays a structured shutdown event to zero or more chat webhook
//! endpoints as an Adaptive Card. A relay with no configured endpoints is
//! a no-op; delivery attempts to multiple endpoints are independent, and
//! a failure against one endpoint never affects the others or the caller.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ReaperError, Result};

/// A shutdown notification, constructed once per stopped instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownEvent {
    pub instance_id: String,
    pub instance_name: String,
    pub idle_hours: f64,
    pub cpu_avg: Option<f64>,
    pub network_avg: Option<f64>,
    pub disk_backend: String,
    pub timestamp: String,
}

/// Fan-out of shutdown events to external endpoints.
#[async_trait::async_trait]
pub trait NotificationRelay: Send + Sync {
    /// Deliver the event on a best-effort basis. Never raises.
    async fn publish(&self, event: &ShutdownEvent);
}

/// Posts shutdown notifications to chat webhooks
pub struct WebhookRelay {
    endpoints: Vec<String>,
    http: reqwest::Client,
}

impl WebhookRelay {
    /// Create a relay for the given webhook endpoints (may be empty).
    pub fn new(endpoints: Vec<String>, http: reqwest::Client) -> Self {
        Self { endpoints, http }
    }

    async fn post_card(&self, endpoint: &str, card: &serde_json::Value) -> Result<()> {
        let response = self.http.post(endpoint).json(card).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReaperError::Http(format!("status {}: {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationRelay for WebhookRelay {
    async fn publish(&self, event: &ShutdownEvent) {
        if self.endpoints.is_empty() {
            debug!("No webhook endpoints configured, skipping notification");
            return;
        }

        let card = build_card(event);
        let attempts = self
            .endpoints
            .iter()
            .map(|endpoint| self.post_card(endpoint, &card));

        for (endpoint, result) in self.endpoints.iter().zip(join_all(attempts).await) {
            match result {
                Ok(()) => {
                    info!(
                        instance = %event.instance_id,
                        endpoint = %endpoint,
                        "Sent shutdown notification",
                    );
                }
                Err(e) => {
                    warn!(
                        instance = %event.instance_id,
                        endpoint = %endpoint,
                        error = %e,
                        "Failed to send shutdown notification",
                    );
                }
            }
        }
    }
}

/// Build the Adaptive Card payload for a shutdown event.
fn build_card(event: &ShutdownEvent) -> serde_json::Value {
    let cpu = match event.cpu_avg {
        Some(avg) => format!("{:.2}%", avg),
        None => "N/A".to_string(),
    };
    let network = match event.network_avg {
        Some(avg) => format!("{:.0} bytes", avg),
        None => "N/A".to_string(),
    };

    serde_json::json!({
        "type": "message",
        "attachments": [
            {
                "contentType": "application/vnd.microsoft.card.adaptive",
                "contentUrl": null,
                "content": {
                    "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
                    "type": "AdaptiveCard",
                    "version": "1.4",
                    "body": [
                        {
                            "type": "Container",
                            "style": "attention",
                            "items": [
                                {
                                    "type": "ColumnSet",
                                    "columns": [
                                        {
                                            "type": "Column",
                                            "width": "auto",
                                            "items": [
                                                {
                                                    "type": "TextBlock",
                                                    "text": "\u{1F534}",
                                                    "size": "ExtraLarge"
                                                }
                                            ]
                                        },
                                        {
                                            "type": "Column",
                                            "width": "stretch",
                                            "items": [
                                                {
                                                    "type": "TextBlock",
                                                    "text": "Instance Shutdown",
                                                    "weight": "Bolder",
                                                    "size": "Large"
                                                },
                                                {
                                                    "type": "TextBlock",
                                                    "text": "Automatic shutdown due to inactivity",
                                                    "isSubtle": true,
                                                    "spacing": "None"
                                                }
                                            ]
                                        }
                                    ]
                                }
                            ]
                        },
                        {
                            "type": "FactSet",
                            "facts": [
                                { "title": "Name:", "value": event.instance_name },
                                { "title": "Instance ID:", "value": event.instance_id },
                                { "title": "Idle Time:", "value": format!("{:.2} hours", event.idle_hours) },
                                { "title": "Avg CPU:", "value": cpu },
                                { "title": "Avg Network:", "value": network },
                                { "title": "Disk Type:", "value": event.disk_backend },
                                { "title": "Timestamp:", "value": event.timestamp }
                            ]
                        }
                    ]
                }
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> ShutdownEvent {
        ShutdownEvent {
            instance_id: "i-0abc123".to_string(),
            instance_name: "ci-runner".to_string(),
            idle_hours: 4.25,
            cpu_avg: Some(2.5),
            network_avg: Some(512.7),
            disk_backend: "Block volume".to_string(),
            timestamp: "2025-06-01 10:00:00 UTC".to_string(),
        }
    }

    fn facts(card: &serde_json::Value) -> &Vec<serde_json::Value> {
        card["attachments"][0]["content"]["body"][1]["facts"]
            .as_array()
            .expect("fact set")
    }

    #[test]
    fn test_card_facts() {
        let card = build_card(&sample_event());
        let facts = facts(&card);

        assert_eq!(facts.len(), 7);
        assert_eq!(facts[0]["value"], "ci-runner");
        assert_eq!(facts[1]["value"], "i-0abc123");
        assert_eq!(facts[2]["value"], "4.25 hours");
        assert_eq!(facts[3]["value"], "2.50%");
        assert_eq!(facts[4]["value"], "513 bytes");
        assert_eq!(facts[5]["value"], "Block volume");
    }

    #[test]
    fn test_card_missing_averages_render_as_na() {
        let mut event = sample_event();
        event.cpu_avg = None;
        event.network_avg = None;

        let card = build_card(&event);
        let facts = facts(&card);
        assert_eq!(facts[3]["value"], "N/A");
        assert_eq!(facts[4]["value"], "N/A");
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = sample_event();
        let json = serde_json::to_string(&event).unwrap();
        let back: ShutdownEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.instance_id, event.instance_id);
        assert_eq!(back.cpu_avg, event.cpu_avg);
    }

    #[tokio::test]
    async fn test_publish_without_endpoints_is_a_noop() {
        let relay = WebhookRelay::new(Vec::new(), reqwest::Client::new());
        relay.publish(&sample_event()).await;
    }
}
