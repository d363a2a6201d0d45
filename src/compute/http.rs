//! HTTP client for the compute platform REST API
//!
//! One client implements all four platform capabilities: instance
//! listing/lookup, tag CRUD, metric queries, and the stop action.

use super::{Datapoint, Instance, InstanceDirectory, MetricsGateway, StopAction, TagStore};
use crate::error::{ReaperError, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

/// Client for the compute platform REST API
pub struct HttpComputeClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ListInstancesResponse {
    instances: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
struct TagValueResponse {
    value: String,
}

#[derive(Debug, Deserialize)]
struct MetricQueryResponse {
    datapoints: Vec<Datapoint>,
}

impl HttpComputeClient {
    /// Create a new client for the given API base URL.
    pub fn new(base_url: impl Into<String>, token: Option<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token,
            http,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Map a non-success response to an API error carrying the status and
    /// response body.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ReaperError::Api(format!("status {}: {}", status, body)))
    }
}

#[async_trait::async_trait]
impl InstanceDirectory for HttpComputeClient {
    async fn list_running(&self) -> Result<Vec<Instance>> {
        let response = self
            .request(reqwest::Method::GET, "/v1/instances")
            .query(&[("state", "running")])
            .send()
            .await?;
        let parsed: ListInstancesResponse = Self::check(response).await?.json().await?;
        debug!(count = parsed.instances.len(), "Listed running instances");
        Ok(parsed.instances)
    }

    async fn describe(&self, instance_id: &str) -> Result<Option<Instance>> {
        let response = self
            .request(reqwest::Method::GET, &format!("/v1/instances/{}", instance_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let instance: Instance = Self::check(response).await?.json().await?;
        Ok(Some(instance))
    }
}

#[async_trait::async_trait]
impl TagStore for HttpComputeClient {
    async fn get_tag(&self, instance_id: &str, key: &str) -> Result<Option<String>> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/instances/{}/tags/{}", instance_id, key),
            )
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let parsed: TagValueResponse = Self::check(response).await?.json().await?;
        Ok(Some(parsed.value))
    }

    async fn set_tag(&self, instance_id: &str, key: &str, value: &str) -> Result<()> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/v1/instances/{}/tags/{}", instance_id, key),
            )
            .json(&serde_json::json!({ "value": value }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_tag(&self, instance_id: &str, key: &str) -> Result<()> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/v1/instances/{}/tags/{}", instance_id, key),
            )
            .send()
            .await?;
        // Deleting an absent tag is not an error
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MetricsGateway for HttpComputeClient {
    async fn query(
        &self,
        instance_id: &str,
        signal: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        period_seconds: i64,
    ) -> Result<Vec<Datapoint>> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/instances/{}/metrics/{}", instance_id, signal),
            )
            .query(&[
                ("start", start.to_rfc3339()),
                ("end", end.to_rfc3339()),
                ("period", period_seconds.to_string()),
            ])
            .send()
            .await?;
        let parsed: MetricQueryResponse = Self::check(response).await?.json().await?;
        Ok(parsed.datapoints)
    }
}

#[async_trait::async_trait]
impl StopAction for HttpComputeClient {
    async fn stop(&self, instance_id: &str) -> Result<()> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/v1/instances/{}/actions/stop", instance_id),
            )
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::InstanceState;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = HttpComputeClient::new(
            "http://localhost:8405/",
            None,
            reqwest::Client::new(),
        );
        assert_eq!(client.base_url, "http://localhost:8405");
    }

    #[test]
    fn test_list_response_parsing() {
        let json = r#"{
            "instances": [
                {"id": "i-0abc", "state": "running", "tags": {"Name": "ci-runner"}},
                {"id": "i-0def", "state": "running"}
            ]
        }"#;

        let parsed: ListInstancesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.instances.len(), 2);
        assert_eq!(parsed.instances[0].state, InstanceState::Running);
        assert_eq!(
            parsed.instances[0].tags.get("Name").map(String::as_str),
            Some("ci-runner")
        );
    }

    #[test]
    fn test_metric_response_parsing() {
        let json = r#"{
            "datapoints": [
                {"timestamp": "2025-06-01T10:00:00Z", "average": 2.5},
                {"timestamp": "2025-06-01T10:05:00Z", "average": 1.25}
            ]
        }"#;

        let parsed: MetricQueryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.datapoints.len(), 2);
        assert_eq!(parsed.datapoints[1].average, 1.25);
    }

    #[test]
    fn test_tag_value_response_parsing() {
        let parsed: TagValueResponse =
            serde_json::from_str(r#"{"value": "1733000000.5"}"#).unwrap();
        assert_eq!(parsed.value, "1733000000.5");
    }
}
