use crate::scheduler::SweepKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for [`crate::engine::MonitoringEngine`].
///
/// Every field has a default, so an empty `[engine]` table is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Samples kept per resource before the oldest is evicted.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Samples older than this are dropped by the retention sweep.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    #[serde(default = "default_resolution_interval_secs")]
    pub resolution_interval_secs: u64,

    #[serde(default = "default_anomaly_interval_secs")]
    pub anomaly_interval_secs: u64,

    #[serde(default = "default_retention_interval_secs")]
    pub retention_interval_secs: u64,

    /// Consecutive clean samples required before an alert resolves.
    #[serde(default = "default_resolution_samples")]
    pub resolution_samples: usize,

    /// Resources with fewer buffered samples are skipped by the anomaly sweep.
    #[serde(default = "default_anomaly_min_samples")]
    pub anomaly_min_samples: usize,

    /// Number of latest samples handed to the anomaly detector.
    #[serde(default = "default_anomaly_window")]
    pub anomaly_window: usize,

    #[serde(default = "default_anomaly_sensitivity")]
    pub anomaly_sensitivity: f64,

    /// Cap on retained alert history. Oldest resolved alerts go first.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_buffer_capacity() -> usize {
    1000
}

fn default_retention_secs() -> u64 {
    86_400
}

fn default_resolution_interval_secs() -> u64 {
    30
}

fn default_anomaly_interval_secs() -> u64 {
    300
}

fn default_retention_interval_secs() -> u64 {
    3600
}

fn default_resolution_samples() -> usize {
    3
}

fn default_anomaly_min_samples() -> usize {
    10
}

fn default_anomaly_window() -> usize {
    100
}

fn default_anomaly_sensitivity() -> f64 {
    3.0
}

fn default_history_limit() -> usize {
    10_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            retention_secs: default_retention_secs(),
            resolution_interval_secs: default_resolution_interval_secs(),
            anomaly_interval_secs: default_anomaly_interval_secs(),
            retention_interval_secs: default_retention_interval_secs(),
            resolution_samples: default_resolution_samples(),
            anomaly_min_samples: default_anomaly_min_samples(),
            anomaly_window: default_anomaly_window(),
            anomaly_sensitivity: default_anomaly_sensitivity(),
            history_limit: default_history_limit(),
        }
    }
}

impl EngineConfig {
    pub fn sweep_interval(&self, kind: SweepKind) -> Duration {
        let secs = match kind {
            SweepKind::Resolution => self.resolution_interval_secs,
            SweepKind::Anomaly => self.anomaly_interval_secs,
            SweepKind::Retention => self.retention_interval_secs,
        };
        Duration::from_secs(secs)
    }

    pub fn retention(&self) -> chrono::Duration {
        let max = (i64::MAX / 1000) as u64;
        chrono::Duration::seconds(self.retention_secs.min(max) as i64)
    }
}
