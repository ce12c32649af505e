use crate::error::NotifyError;
use crate::plugin::ChannelPlugin;
use crate::utils::{truncate_string, MAX_BODY_LENGTH};
use crate::NotificationChannel;
use anyhow::Result;
use async_trait::async_trait;
use cloudguard_common::types::{AlertEvent, AlertEventKind, AlertStatus, Severity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;

/// JSON body posted when no template is configured.
#[derive(Serialize)]
struct DefaultPayload<'a> {
    event: AlertEventKind,
    alert_id: &'a str,
    rule_id: &'a str,
    rule_name: &'a str,
    resource_id: &'a str,
    metric: &'a str,
    severity: Severity,
    status: AlertStatus,
    message: &'a str,
    value: f64,
    threshold: f64,
    triggered_at: String,
    timestamp: String,
}

/// Posts every event to a fixed list of URLs, optionally through a
/// `{{placeholder}}` body template.
pub struct WebhookChannel {
    name: String,
    http: reqwest::Client,
    urls: Vec<String>,
    template: Option<String>,
}

impl WebhookChannel {
    pub fn new(instance_id: &str, urls: Vec<String>, template: Option<String>) -> Self {
        Self {
            name: instance_id.to_owned(),
            http: reqwest::Client::new(),
            urls,
            template,
        }
    }

    pub(crate) fn render_body(&self, event: &AlertEvent) -> String {
        let alert = &event.alert;
        let Some(template) = &self.template else {
            let payload = DefaultPayload {
                event: event.kind,
                alert_id: &alert.id,
                rule_id: &alert.rule_id,
                rule_name: &alert.rule_name,
                resource_id: &alert.resource_id,
                metric: &alert.metric,
                severity: alert.severity,
                status: alert.status,
                message: &alert.message,
                value: alert.observed_value,
                threshold: alert.threshold,
                triggered_at: alert.triggered_at.to_rfc3339(),
                timestamp: event.timestamp.to_rfc3339(),
            };
            return serde_json::to_string(&payload).unwrap_or_default();
        };

        let fields = [
            ("event", event.kind.to_string()),
            ("alert_id", alert.id.clone()),
            ("rule_id", alert.rule_id.clone()),
            ("rule_name", alert.rule_name.clone()),
            ("resource_id", alert.resource_id.clone()),
            ("metric", alert.metric.clone()),
            ("value", format!("{:.2}", alert.observed_value)),
            ("threshold", format!("{:.2}", alert.threshold)),
            ("severity", alert.severity.to_string()),
            ("status", alert.status.to_string()),
            ("message", alert.message.clone()),
            ("timestamp", event.timestamp.to_rfc3339()),
        ];
        fields
            .iter()
            .fold(template.clone(), |body, (key, value)| {
                body.replace(&format!("{{{{{key}}}}}"), value)
            })
    }

    async fn post_once(&self, url: &str, body: &str) -> Result<()> {
        let resp = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_owned())
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = resp
            .text()
            .await
            .map(|text| truncate_string(&text, MAX_BODY_LENGTH))
            .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
        Err(NotifyError::ApiError {
            service: format!("webhook {url}"),
            status: status.as_u16(),
            body: detail,
        }
        .into())
    }

    /// Up to [`MAX_ATTEMPTS`] tries with 100ms, 200ms backoff in between.
    async fn post_with_retry(&self, url: &str, body: &str) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.post_once(url, body).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= MAX_ATTEMPTS => return Err(e),
                Err(e) => {
                    tracing::warn!(channel = %self.name, url, attempt, error = %e, "Webhook post failed, retrying");
                    tokio::time::sleep(Duration::from_millis(100 << (attempt - 1))).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, event: &AlertEvent) -> Result<()> {
        let body = self.render_body(event);
        let mut failed = 0usize;

        for url in &self.urls {
            if let Err(e) = self.post_with_retry(url, &body).await {
                tracing::error!(
                    channel = %self.name,
                    url = %url,
                    error = %e,
                    "Webhook failed after {MAX_ATTEMPTS} attempts"
                );
                failed += 1;
            }
        }

        if failed > 0 {
            anyhow::bail!("{failed} of {} webhook targets failed", self.urls.len());
        }
        Ok(())
    }

    fn channel_type(&self) -> &str {
        "webhook"
    }

    fn instance_id(&self) -> &str {
        &self.name
    }
}

// Plugin

#[derive(Deserialize)]
struct WebhookConfig {
    #[serde(default)]
    urls: Vec<String>,
    /// Extra target URLs supplied as channel recipients.
    #[serde(default)]
    recipients: Vec<String>,
    body_template: Option<String>,
}

pub struct WebhookPlugin;

impl WebhookPlugin {
    fn parse(config: &Value) -> crate::error::Result<WebhookConfig> {
        let mut cfg: WebhookConfig = serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("webhook: {e}")))?;
        let recipients = std::mem::take(&mut cfg.recipients);
        for url in recipients {
            if !cfg.urls.contains(&url) {
                cfg.urls.push(url);
            }
        }
        if cfg.urls.is_empty() {
            return Err(NotifyError::InvalidConfig(
                "webhook: at least one url is required".to_string(),
            ));
        }
        if let Some(bad) = cfg
            .urls
            .iter()
            .find(|u| !(u.starts_with("http://") || u.starts_with("https://")))
        {
            return Err(NotifyError::InvalidConfig(format!(
                "webhook: unsupported url '{bad}'"
            )));
        }
        Ok(cfg)
    }
}

impl ChannelPlugin for WebhookPlugin {
    fn name(&self) -> &str {
        "webhook"
    }

    fn validate_config(&self, config: &Value) -> crate::error::Result<()> {
        Self::parse(config).map(|_| ())
    }

    fn create_channel(
        &self,
        instance_id: &str,
        config: &Value,
    ) -> crate::error::Result<Box<dyn NotificationChannel>> {
        let cfg = Self::parse(config)?;
        Ok(Box::new(WebhookChannel::new(
            instance_id,
            cfg.urls,
            cfg.body_template,
        )))
    }
}
