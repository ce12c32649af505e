use anyhow::Context;
use cloudguard_alert::rules::RuleConfig;
use cloudguard_alert::EngineConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    /// JSON rule seed loaded at start-up.
    #[serde(default)]
    pub rules_file: Option<String>,

    /// Snowflake machine/node ids for alert ids, each in `0..=31`.
    #[serde(default = "default_id_part")]
    pub machine_id: i32,
    #[serde(default = "default_id_part")]
    pub node_id: i32,

    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub silence_windows: Vec<SilenceWindowConfig>,
    #[serde(default)]
    pub autoscale: Option<AutoscaleConfig>,
}

fn default_id_part() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    pub channel_type: String,
    #[serde(default = "default_min_severity")]
    pub min_severity: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Action kinds (`notify`, `escalate`, `page`) this channel serves.
    #[serde(default)]
    pub actions: Vec<String>,
    /// Plugin-specific settings, validated by the channel plugin.
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilenceWindowConfig {
    /// `HH:MM` or `HH:MM:SS`, UTC.
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub recurrence: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoscaleConfig {
    pub endpoint: String,
    #[serde(default = "default_autoscale_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_min_severity() -> String {
    "low".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_autoscale_timeout_secs() -> u64 {
    10
}

// ---- Rules seed file ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesSeedFile {
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            rules_file: None,
            machine_id: default_id_part(),
            node_id: default_id_part(),
            channels: Vec::new(),
            silence_windows: Vec::new(),
            autoscale: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let engine = &self.engine;
        anyhow::ensure!(
            engine.resolution_interval_secs > 0
                && engine.anomaly_interval_secs > 0
                && engine.retention_interval_secs > 0,
            "engine sweep intervals must be greater than zero"
        );
        anyhow::ensure!(engine.buffer_capacity > 0, "engine.buffer_capacity must be greater than zero");
        anyhow::ensure!(
            engine.anomaly_sensitivity.is_finite() && engine.anomaly_sensitivity > 0.0,
            "engine.anomaly_sensitivity must be a positive number"
        );
        anyhow::ensure!(
            (0..=31).contains(&self.machine_id) && (0..=31).contains(&self.node_id),
            "machine_id and node_id must be between 0 and 31"
        );
        Ok(())
    }
}
