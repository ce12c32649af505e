//! Wires configuration into a running engine: notification channels and
//! routes, the action dispatcher, the autoscaler and the rule seed.

use crate::config::{ChannelConfig, ServerConfig, SilenceWindowConfig};
use crate::rule_seed;
use anyhow::Context;
use chrono::NaiveTime;
use cloudguard_alert::MonitoringEngine;
use cloudguard_common::id::IdGenerator;
use cloudguard_common::types::{ActionKind, Severity};
use cloudguard_notify::autoscale::WebhookAutoscaler;
use cloudguard_notify::dispatcher::ActionDispatcher;
use cloudguard_notify::manager::{NotificationManager, SilenceWindow};
use cloudguard_notify::plugin::ChannelRegistry;
use cloudguard_notify::routing::ChannelRoute;
use cloudguard_notify::NotificationChannel;
use std::sync::Arc;
use std::time::Duration;

/// Builds channels and their routes. A channel that fails validation is
/// logged and left out; the rest still load.
pub fn build_notifier(config: &ServerConfig, registry: &ChannelRegistry) -> anyhow::Result<NotificationManager> {
    let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();
    let mut routes = Vec::new();

    for ch in config.channels.iter().filter(|c| c.enabled) {
        match build_channel(ch, registry) {
            Ok((channel, min_severity, actions)) => {
                routes.push(ChannelRoute {
                    min_severity,
                    channel_index: channels.len(),
                    actions,
                });
                channels.push(channel);
                tracing::info!(name = %ch.name, channel_type = %ch.channel_type, "Notification channel loaded");
            }
            Err(e) => {
                tracing::error!(name = %ch.name, error = %e, "Failed to load notification channel");
            }
        }
    }

    let silence_windows = config
        .silence_windows
        .iter()
        .map(parse_silence_window)
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(NotificationManager::new(channels, routes, silence_windows))
}

fn build_channel(
    ch: &ChannelConfig,
    registry: &ChannelRegistry,
) -> anyhow::Result<(Box<dyn NotificationChannel>, Severity, Vec<ActionKind>)> {
    let min_severity: Severity = ch
        .min_severity
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let actions = ch
        .actions
        .iter()
        .map(|a| a.parse::<ActionKind>().map_err(|e| anyhow::anyhow!(e)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut plugin_config = ch.config.clone();
    if !ch.recipients.is_empty() {
        if plugin_config.is_null() {
            plugin_config = serde_json::json!({});
        }
        if let Some(obj) = plugin_config.as_object_mut() {
            obj.insert("recipients".to_string(), serde_json::json!(ch.recipients));
        }
    }

    if let Some(plugin) = registry.get_plugin(&ch.channel_type) {
        tracing::debug!(
            name = %ch.name,
            config = %plugin.redact_config(&plugin_config),
            "Creating notification channel"
        );
    }
    let channel = registry.create_channel(&ch.channel_type, &ch.name, &plugin_config)?;
    Ok((channel, min_severity, actions))
}

pub fn parse_silence_window(sw: &SilenceWindowConfig) -> anyhow::Result<SilenceWindow> {
    Ok(SilenceWindow {
        start: parse_time(&sw.start_time)?,
        end: parse_time(&sw.end_time)?,
        recurrence: sw.recurrence.clone(),
    })
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .with_context(|| format!("Invalid silence window time '{s}'"))
}

pub fn build_dispatcher(config: &ServerConfig, notifier: Arc<NotificationManager>) -> anyhow::Result<ActionDispatcher> {
    let mut dispatcher = ActionDispatcher::new().with_notifier(notifier);
    if let Some(autoscale) = &config.autoscale {
        let client = WebhookAutoscaler::new(&autoscale.endpoint, Duration::from_secs(autoscale.timeout_secs))
            .context("Failed to create autoscaler client")?;
        tracing::info!(endpoint = %client.endpoint(), "Autoscaler configured");
        dispatcher = dispatcher.with_autoscaler(Arc::new(client));
    }
    Ok(dispatcher)
}

/// Builds the engine and loads the rule seed, if one is configured.
pub fn build_engine(config: &ServerConfig) -> anyhow::Result<Arc<MonitoringEngine>> {
    config.validate()?;
    let registry = ChannelRegistry::with_builtin();
    let notifier = Arc::new(build_notifier(config, &registry)?);
    let dispatcher = build_dispatcher(config, notifier)?;

    let engine = MonitoringEngine::new(config.engine.clone(), dispatcher)
        .with_id_generator(IdGenerator::new(config.machine_id, config.node_id));

    if let Some(path) = &config.rules_file {
        rule_seed::init_rules_from_file(&engine, path)?;
    }

    Ok(Arc::new(engine))
}
