//! Autoscale collaborator: turns a triggered alert into a scaling request
//! for an external autoscaler.

use crate::error::NotifyError;
use crate::utils::{truncate_string, MAX_BODY_LENGTH};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudguard_common::types::Alert;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDirection {
    ScaleOut,
    ScaleIn,
}

/// Scaling policy submitted for the resource and metric that breached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingRequest {
    pub resource_id: String,
    pub metric: String,
    pub threshold: f64,
    pub observed_value: f64,
    pub direction: ScaleDirection,
    pub alert_id: String,
    pub requested_at: DateTime<Utc>,
}

impl ScalingRequest {
    /// A value at or above the threshold asks for more capacity; below it,
    /// for less.
    pub fn for_alert(alert: &Alert, requested_at: DateTime<Utc>) -> Self {
        let direction = if alert.observed_value >= alert.threshold {
            ScaleDirection::ScaleOut
        } else {
            ScaleDirection::ScaleIn
        };
        Self {
            resource_id: alert.resource_id.clone(),
            metric: alert.metric.clone(),
            threshold: alert.threshold,
            observed_value: alert.observed_value,
            direction,
            alert_id: alert.id.clone(),
            requested_at,
        }
    }
}

#[async_trait]
pub trait AutoscaleClient: Send + Sync {
    async fn submit_scaling_policy(&self, request: &ScalingRequest) -> Result<()>;
}

/// Posts scaling requests as JSON to an HTTP endpoint.
pub struct WebhookAutoscaler {
    endpoint: String,
    client: reqwest::Client,
}

impl WebhookAutoscaler {
    pub fn new(endpoint: &str, timeout: Duration) -> crate::error::Result<Self> {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(NotifyError::InvalidConfig(format!(
                "autoscale: unsupported endpoint '{endpoint}'"
            )));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AutoscaleClient for WebhookAutoscaler {
    async fn submit_scaling_policy(&self, request: &ScalingRequest) -> Result<()> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(NotifyError::from)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::ApiError {
                service: "autoscaler".to_string(),
                status: status.as_u16(),
                body: truncate_string(&body, MAX_BODY_LENGTH),
            }
            .into());
        }

        tracing::info!(
            resource_id = %request.resource_id,
            metric = %request.metric,
            direction = ?request.direction,
            "Scaling request submitted"
        );
        Ok(())
    }
}
