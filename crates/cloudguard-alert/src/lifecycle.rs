use crate::error::{AlertError, Result};
use crate::rules::MonitoringRule;
use chrono::{DateTime, Utc};
use cloudguard_common::id::IdGenerator;
use cloudguard_common::types::{Alert, AlertStatus, Anomaly, Metric};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Rule id carried by alerts raised from the anomaly sweep.
pub const ANOMALY_RULE_ID: &str = "anomaly-detection";

/// Key: (rule_id, resource_id)
pub type AlertKey = (String, String);

/// Synthetic key under which an anomaly on `metric` is tracked.
pub fn anomaly_key(metric: &str, resource_id: &str) -> AlertKey {
    (format!("{ANOMALY_RULE_ID}:{metric}"), resource_id.to_string())
}

#[derive(Default)]
struct AlertState {
    /// At most one live alert id per key.
    active: HashMap<AlertKey, String>,
    records: HashMap<String, Alert>,
    /// History by insertion sequence.
    order: BTreeMap<u64, String>,
    seq_of: HashMap<String, u64>,
    /// Sequences of resolved alerts still held in history, the trim queue.
    resolved: BTreeSet<u64>,
    next_seq: u64,
}

impl AlertState {
    fn insert(&mut self, key: AlertKey, alert: Alert, limit: usize) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.active.insert(key, alert.id.clone());
        self.order.insert(seq, alert.id.clone());
        self.seq_of.insert(alert.id.clone(), seq);
        self.records.insert(alert.id.clone(), alert);
        self.enforce_limit(limit);
    }

    /// Drops the oldest resolved records until history fits. Live alerts
    /// are never dropped.
    fn enforce_limit(&mut self, limit: usize) {
        while self.order.len() > limit {
            let Some(seq) = self.resolved.pop_first() else {
                break;
            };
            if let Some(id) = self.order.remove(&seq) {
                self.seq_of.remove(&id);
                self.records.remove(&id);
            }
        }
    }

    fn resolve(&mut self, key: &AlertKey, now: DateTime<Utc>, limit: usize) -> Option<Alert> {
        let id = self.active.remove(key)?;
        if let Some(&seq) = self.seq_of.get(&id) {
            self.resolved.insert(seq);
        }
        let alert = self.records.get_mut(&id).map(|alert| {
            alert.status = AlertStatus::Resolved;
            alert.resolved_at = Some(now);
            alert.clone()
        });
        tracing::info!(alert_id = %id, rule_id = %key.0, resource_id = %key.1, "Alert resolved");
        self.enforce_limit(limit);
        alert
    }
}

/// Owns the active index and alert history and applies lifecycle
/// transitions. Every transition runs under one lock.
pub struct AlertManager {
    state: Mutex<AlertState>,
    ids: IdGenerator,
    history_limit: usize,
}

impl AlertManager {
    pub fn new(history_limit: usize, ids: IdGenerator) -> Self {
        Self {
            state: Mutex::new(AlertState::default()),
            ids,
            history_limit: history_limit.max(1),
        }
    }

    /// Creates an alert for `(rule, sample.resource_id)` unless one is
    /// already live. Returns the new alert.
    pub fn trigger(&self, rule: &MonitoringRule, sample: &Metric, now: DateTime<Utc>) -> Option<Alert> {
        let key = (rule.id.clone(), sample.resource_id.clone());
        let mut state = self.state.lock();
        if state.active.contains_key(&key) {
            tracing::debug!(
                rule_id = %rule.id,
                resource_id = %sample.resource_id,
                "Alert suppressed (already active)"
            );
            return None;
        }

        let alert = Alert {
            id: self.ids.next_id(),
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            resource_id: sample.resource_id.clone(),
            metric: rule.metric.clone(),
            observed_value: sample.value,
            threshold: rule.threshold,
            severity: rule.severity,
            triggered_at: now,
            acknowledged_at: None,
            resolved_at: None,
            status: AlertStatus::Active,
            message: format!(
                "{} is {} {:.1} on {} (observed {:.2})",
                rule.metric,
                rule.operator.describe(),
                rule.threshold,
                sample.resource_id,
                sample.value
            ),
        };
        tracing::info!(
            alert_id = %alert.id,
            rule_id = %rule.id,
            resource_id = %alert.resource_id,
            severity = %alert.severity,
            value = sample.value,
            "Alert triggered"
        );
        state.insert(key, alert.clone(), self.history_limit);
        Some(alert)
    }

    /// Creates an anomaly alert for `resource_id` unless the same metric is
    /// already flagged there.
    pub fn raise_anomaly(&self, resource_id: &str, anomaly: &Anomaly, now: DateTime<Utc>) -> Option<Alert> {
        let key = anomaly_key(&anomaly.metric, resource_id);
        let mut state = self.state.lock();
        if state.active.contains_key(&key) {
            return None;
        }

        let alert = Alert {
            id: self.ids.next_id(),
            rule_id: ANOMALY_RULE_ID.to_string(),
            rule_name: "Anomaly detection".to_string(),
            resource_id: resource_id.to_string(),
            metric: anomaly.metric.clone(),
            observed_value: anomaly.value,
            threshold: anomaly.expected_value,
            severity: anomaly.severity,
            triggered_at: now,
            acknowledged_at: None,
            resolved_at: None,
            status: AlertStatus::Active,
            message: anomaly.description.clone(),
        };
        tracing::info!(
            alert_id = %alert.id,
            resource_id,
            metric = %anomaly.metric,
            severity = %anomaly.severity,
            "Anomaly alert raised"
        );
        state.insert(key, alert.clone(), self.history_limit);
        Some(alert)
    }

    /// Resolves the live alert under `key`, freeing the key for a fresh
    /// alert.
    pub fn resolve(&self, key: &AlertKey, now: DateTime<Utc>) -> Option<Alert> {
        self.state.lock().resolve(key, now, self.history_limit)
    }

    /// Resolves `key` only while it still maps to `alert_id`. A key that
    /// was resolved and re-triggered since the caller looked is left alone.
    pub fn resolve_alert(&self, key: &AlertKey, alert_id: &str, now: DateTime<Utc>) -> Option<Alert> {
        let mut state = self.state.lock();
        if state.active.get(key).map(String::as_str) != Some(alert_id) {
            return None;
        }
        state.resolve(key, now, self.history_limit)
    }

    /// Only an `Active` alert can be acknowledged.
    pub fn acknowledge(&self, id: &str, now: DateTime<Utc>) -> Result<Alert> {
        let mut state = self.state.lock();
        let alert = state
            .records
            .get_mut(id)
            .ok_or_else(|| AlertError::AlertNotFound(id.to_string()))?;
        if alert.status != AlertStatus::Active {
            return Err(AlertError::InvalidTransition {
                id: id.to_string(),
                status: alert.status,
            });
        }
        alert.status = AlertStatus::Acknowledged;
        alert.acknowledged_at = Some(now);
        tracing::info!(alert_id = %id, rule_id = %alert.rule_id, "Alert acknowledged");
        Ok(alert.clone())
    }

    /// Live alerts, oldest trigger first.
    pub fn active(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .live_entries()
            .into_iter()
            .map(|(_, alert)| alert)
            .collect();
        alerts.sort_by(|a, b| a.triggered_at.cmp(&b.triggered_at));
        alerts
    }

    /// Snapshot of the active index.
    pub fn live_entries(&self) -> Vec<(AlertKey, Alert)> {
        let state = self.state.lock();
        state
            .active
            .iter()
            .filter_map(|(key, id)| state.records.get(id).map(|a| (key.clone(), a.clone())))
            .collect()
    }

    /// Keys of live anomaly alerts on `resource_id`.
    pub fn live_anomaly_keys(&self, resource_id: &str) -> Vec<AlertKey> {
        let prefix = format!("{ANOMALY_RULE_ID}:");
        self.state
            .lock()
            .active
            .keys()
            .filter(|(rule, resource)| resource == resource_id && rule.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Newest first, at most `limit` entries.
    pub fn history(&self, limit: usize) -> Vec<Alert> {
        let state = self.state.lock();
        state
            .order
            .values()
            .rev()
            .filter_map(|id| state.records.get(id).cloned())
            .take(limit)
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Alert> {
        self.state.lock().records.get(id).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().order.len()
    }
}
