//! Anomaly collaborator contract and the built-in z-score scorer.

use anyhow::Result;
use async_trait::async_trait;
use cloudguard_common::types::{Anomaly, Metric, Severity};
use std::collections::BTreeMap;

/// Scores a window of recent samples for one resource.
///
/// Implementations may call out to a remote service; the engine never holds
/// a lock across this call.
#[async_trait]
pub trait AnomalyDetector: Send + Sync {
    async fn detect_anomalies(
        &self,
        resource_id: &str,
        recent: &[Metric],
        sensitivity: f64,
    ) -> Result<Vec<Anomaly>>;
}

/// Scores the latest sample of each metric against the mean and standard
/// deviation of the samples before it.
#[derive(Debug, Clone)]
pub struct ZScoreDetector {
    min_baseline: usize,
}

impl ZScoreDetector {
    /// `min_baseline` is the number of earlier samples a metric needs
    /// before its latest value is scored.
    pub fn new(min_baseline: usize) -> Self {
        Self {
            min_baseline: min_baseline.max(2),
        }
    }

    fn score(&self, metric: &str, samples: &[&Metric], sensitivity: f64) -> Option<Anomaly> {
        let (latest, baseline) = samples.split_last()?;
        if baseline.len() < self.min_baseline {
            return None;
        }

        let n = baseline.len() as f64;
        let mean = baseline.iter().map(|m| m.value).sum::<f64>() / n;
        let variance = baseline.iter().map(|m| (m.value - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        if std_dev < f64::EPSILON {
            return None;
        }

        let z_score = (latest.value - mean).abs() / std_dev;
        if z_score <= sensitivity {
            return None;
        }

        let severity = if z_score > sensitivity * 2.0 {
            Severity::Critical
        } else if z_score > sensitivity * 1.5 {
            Severity::High
        } else {
            Severity::Medium
        };

        Some(Anomaly {
            metric: metric.to_string(),
            value: latest.value,
            expected_value: mean,
            severity,
            timestamp: latest.timestamp,
            description: format!(
                "{metric} value {:.2} deviates from expected {mean:.2} (z-score {z_score:.2}, sensitivity {sensitivity:.1})",
                latest.value
            ),
        })
    }
}

impl Default for ZScoreDetector {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl AnomalyDetector for ZScoreDetector {
    async fn detect_anomalies(
        &self,
        _resource_id: &str,
        recent: &[Metric],
        sensitivity: f64,
    ) -> Result<Vec<Anomaly>> {
        if !(sensitivity.is_finite() && sensitivity > 0.0) {
            anyhow::bail!("sensitivity must be a positive number, got {sensitivity}");
        }

        let mut by_metric: BTreeMap<&str, Vec<&Metric>> = BTreeMap::new();
        for sample in recent {
            by_metric.entry(sample.metric_name.as_str()).or_default().push(sample);
        }

        Ok(by_metric
            .into_iter()
            .filter_map(|(metric, samples)| self.score(metric, &samples, sensitivity))
            .collect())
    }
}
