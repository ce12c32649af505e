use crate::error::{NotifyError, Result};
use crate::NotificationChannel;
use serde_json::Value;
use std::collections::BTreeMap;

/// Builds [`NotificationChannel`]s of one type from their JSON settings.
pub trait ChannelPlugin: Send + Sync {
    /// Type name channels refer to in configuration, e.g. `"webhook"`.
    fn name(&self) -> &str;

    fn validate_config(&self, config: &Value) -> Result<()>;

    /// Called only with settings that passed [`validate_config`](Self::validate_config).
    fn create_channel(&self, instance_id: &str, config: &Value)
        -> Result<Box<dyn NotificationChannel>>;

    /// Settings safe to write to the log.
    fn redact_config(&self, config: &Value) -> Value {
        crate::utils::redact_sensitive_json(config)
    }
}

/// Channel types known to the server, keyed by [`ChannelPlugin::name`].
///
/// ```
/// use cloudguard_notify::plugin::ChannelRegistry;
///
/// let registry = ChannelRegistry::with_builtin();
/// assert!(registry.has_plugin("webhook"));
/// assert!(registry.has_plugin("log"));
/// assert!(!registry.has_plugin("pagerduty"));
/// ```
#[derive(Default)]
pub struct ChannelRegistry {
    by_type: BTreeMap<String, Box<dyn ChannelPlugin>>,
}

impl ChannelRegistry {
    /// A registry with no channel types.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in `webhook` and `log` types.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::channels::webhook::WebhookPlugin));
        registry.register(Box::new(crate::channels::log::LogPlugin));
        registry
    }

    /// Registering a second plugin under the same name replaces the first.
    pub fn register(&mut self, plugin: Box<dyn ChannelPlugin>) {
        self.by_type.insert(plugin.name().to_owned(), plugin);
    }

    pub fn create_channel(
        &self,
        channel_type: &str,
        instance_id: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        let Some(plugin) = self.by_type.get(channel_type) else {
            return Err(NotifyError::UnknownChannelType(channel_type.to_owned()));
        };
        plugin.validate_config(config)?;
        plugin.create_channel(instance_id, config)
    }

    pub fn get_plugin(&self, channel_type: &str) -> Option<&dyn ChannelPlugin> {
        self.by_type.get(channel_type).map(|p| p.as_ref())
    }

    pub fn has_plugin(&self, channel_type: &str) -> bool {
        self.by_type.contains_key(channel_type)
    }

    /// Registered type names in ascending order.
    pub fn plugin_names(&self) -> Vec<&str> {
        self.by_type.keys().map(String::as_str).collect()
    }
}
