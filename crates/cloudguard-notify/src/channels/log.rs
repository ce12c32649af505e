use crate::error::NotifyError;
use crate::plugin::ChannelPlugin;
use crate::NotificationChannel;
use anyhow::Result;
use async_trait::async_trait;
use cloudguard_common::types::{AlertEvent, Severity};
use serde::Deserialize;
use serde_json::Value;

/// Emits lifecycle events as structured log records, for dashboards that
/// tail the server's log stream.
pub struct LogChannel {
    instance_id: String,
    label: String,
}

impl LogChannel {
    pub fn new(instance_id: &str, label: Option<String>) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            label: label.unwrap_or_else(|| instance_id.to_string()),
        }
    }
}

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(&self, event: &AlertEvent) -> Result<()> {
        let alert = &event.alert;
        if alert.severity >= Severity::High {
            tracing::warn!(
                channel = %self.label,
                event = %event.kind,
                alert_id = %alert.id,
                rule_id = %alert.rule_id,
                resource_id = %alert.resource_id,
                severity = %alert.severity,
                value = alert.observed_value,
                "{}",
                alert.message
            );
        } else {
            tracing::info!(
                channel = %self.label,
                event = %event.kind,
                alert_id = %alert.id,
                rule_id = %alert.rule_id,
                resource_id = %alert.resource_id,
                severity = %alert.severity,
                value = alert.observed_value,
                "{}",
                alert.message
            );
        }
        Ok(())
    }

    fn channel_type(&self) -> &str {
        "log"
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

#[derive(Deserialize, Default)]
struct LogConfig {
    label: Option<String>,
}

pub struct LogPlugin;

impl ChannelPlugin for LogPlugin {
    fn name(&self) -> &str {
        "log"
    }

    fn validate_config(&self, config: &Value) -> crate::error::Result<()> {
        if config.is_null() {
            return Ok(());
        }
        serde_json::from_value::<LogConfig>(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("log: {e}")))?;
        Ok(())
    }

    fn create_channel(
        &self,
        instance_id: &str,
        config: &Value,
    ) -> crate::error::Result<Box<dyn NotificationChannel>> {
        let cfg = if config.is_null() {
            LogConfig::default()
        } else {
            serde_json::from_value::<LogConfig>(config.clone())
                .map_err(|e| NotifyError::InvalidConfig(format!("log: {e}")))?
        };
        Ok(Box::new(LogChannel::new(instance_id, cfg.label)))
    }
}
