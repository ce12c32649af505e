use crate::anomaly::{AnomalyDetector, ZScoreDetector};
use crate::buffer::MetricBuffer;
use crate::config::EngineConfig;
use crate::error::{AlertError, Result};
use crate::lifecycle::{AlertManager, ANOMALY_RULE_ID};
use crate::rules::{self, MonitoringRule, RuleConfig, RuleStore};
use crate::scheduler::{Scheduler, SweepKind};
use chrono::{DateTime, Utc};
use cloudguard_common::clock::{Clock, SystemClock};
use cloudguard_common::id::IdGenerator;
use cloudguard_common::types::{ActionKind, Alert, AlertEvent, AlertEventKind, Metric};
use cloudguard_notify::dispatcher::ActionDispatcher;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Weak};

/// Point-in-time counters for the engine's in-memory state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub resources: usize,
    pub samples: usize,
    pub rules: usize,
    pub enabled_rules: usize,
    pub active_alerts: usize,
    pub history_len: usize,
}

/// The monitoring and alerting engine.
///
/// Owns the metric buffer, rule store and alert state. Ingestion appends a
/// sample and evaluates matching rules while holding that resource's lock;
/// actions and lifecycle events are handed to the [`ActionDispatcher`]
/// after every lock is released.
pub struct MonitoringEngine {
    config: EngineConfig,
    buffer: MetricBuffer,
    rules: RuleStore,
    alerts: AlertManager,
    dispatcher: ActionDispatcher,
    detector: Arc<dyn AnomalyDetector>,
    clock: Arc<dyn Clock>,
    scheduler: Scheduler,
}

impl MonitoringEngine {
    pub fn new(config: EngineConfig, dispatcher: ActionDispatcher) -> Self {
        Self {
            buffer: MetricBuffer::new(config.buffer_capacity),
            rules: RuleStore::new(),
            alerts: AlertManager::new(config.history_limit, IdGenerator::default()),
            dispatcher,
            detector: Arc::new(ZScoreDetector::default()),
            clock: Arc::new(SystemClock),
            scheduler: Scheduler::new(),
            config,
        }
    }

    pub fn with_detector(mut self, detector: Arc<dyn AnomalyDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.alerts = AlertManager::new(self.config.history_limit, ids);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn buffer(&self) -> &MetricBuffer {
        &self.buffer
    }

    // ── Ingestion ──

    /// Records one sample and evaluates every enabled rule watching it.
    /// Returns the alerts this sample triggered.
    ///
    /// # Errors
    ///
    /// Only for an empty resource or metric name or a non-finite value,
    /// rejected before any state is touched.
    pub fn ingest(
        &self,
        resource_id: &str,
        metric_name: &str,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<Alert>> {
        if resource_id.is_empty() || metric_name.is_empty() {
            return Err(AlertError::InvalidSample(
                "resource id and metric name are required".to_string(),
            ));
        }
        if !value.is_finite() {
            return Err(AlertError::InvalidSample(format!(
                "{metric_name} on {resource_id}: value {value} is not finite"
            )));
        }

        let sample = Metric::new(resource_id, metric_name, value, timestamp);
        let candidates = self.rules.matching(resource_id, metric_name);
        let series = self.buffer.series(resource_id);

        let mut triggered: Vec<(Vec<ActionKind>, Alert)> = Vec::new();
        {
            let mut series = series.lock();
            series.push(sample.clone());
            for rule in &candidates {
                if !rules::threshold::sustained(rule, series.iter(), &sample) {
                    continue;
                }
                if let Some(alert) = self.alerts.trigger(rule, &sample, self.clock.now()) {
                    triggered.push((rule.actions.clone(), alert));
                }
            }
        }

        Ok(triggered
            .into_iter()
            .map(|(actions, alert)| {
                let event = AlertEvent::new(AlertEventKind::Triggered, alert.clone(), alert.triggered_at);
                self.dispatcher.dispatch(&actions, &event);
                self.dispatcher.publish(&event);
                alert
            })
            .collect())
    }

    // ── Rules ──

    pub fn add_rule(&self, rule: MonitoringRule) -> Result<()> {
        rule.validate()?;
        let id = rule.id.clone();
        if self.rules.upsert(rule).is_some() {
            tracing::info!(rule_id = %id, "Rule updated");
        } else {
            tracing::info!(rule_id = %id, "Rule added");
        }
        Ok(())
    }

    pub fn add_rule_config(&self, config: RuleConfig) -> Result<()> {
        self.add_rule(MonitoringRule::try_from(config)?)
    }

    /// Live alerts of a removed rule are resolved by the next resolution
    /// sweep.
    pub fn remove_rule(&self, id: &str) -> Result<MonitoringRule> {
        let removed = self
            .rules
            .remove(id)
            .ok_or_else(|| AlertError::RuleNotFound(id.to_string()))?;
        tracing::info!(rule_id = %id, "Rule removed");
        Ok(Arc::unwrap_or_clone(removed))
    }

    pub fn set_rule_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        self.rules.set_enabled(id, enabled)?;
        tracing::info!(rule_id = %id, enabled, "Rule toggled");
        Ok(())
    }

    /// Sorted by id.
    pub fn list_rules(&self) -> Vec<MonitoringRule> {
        let mut rules: Vec<MonitoringRule> = self
            .rules
            .list()
            .into_iter()
            .map(Arc::unwrap_or_clone)
            .collect();
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        rules
    }

    // ── Alerts ──

    pub fn acknowledge_alert(&self, id: &str) -> Result<Alert> {
        let now = self.clock.now();
        let alert = self.alerts.acknowledge(id, now)?;
        self.dispatcher
            .publish(&AlertEvent::new(AlertEventKind::Acknowledged, alert.clone(), now));
        Ok(alert)
    }

    pub fn list_active_alerts(&self) -> Vec<Alert> {
        self.alerts.active()
    }

    /// Newest first.
    pub fn list_alert_history(&self, limit: usize) -> Vec<Alert> {
        self.alerts.history(limit)
    }

    pub fn get_alert(&self, id: &str) -> Option<Alert> {
        self.alerts.get(id)
    }

    // ── Sweeps ──

    /// Resolves live alerts whose last `resolution_samples` samples all
    /// clear their rule, and alerts whose rule no longer exists. Returns
    /// the number resolved.
    pub fn run_resolution_sweep(&self) -> usize {
        let needed = self.config.resolution_samples.max(1);
        let mut resolved = Vec::new();

        for (key, alert) in self.alerts.live_entries() {
            if alert.rule_id == ANOMALY_RULE_ID {
                continue;
            }
            let now = self.clock.now();
            let Some(rule) = self.rules.get(&alert.rule_id) else {
                tracing::info!(
                    alert_id = %alert.id,
                    rule_id = %alert.rule_id,
                    "Rule no longer exists, resolving orphaned alert"
                );
                resolved.extend(self.alerts.resolve_alert(&key, &alert.id, now));
                continue;
            };
            let Some(series) = self.buffer.get(&alert.resource_id) else {
                continue;
            };

            // Held across the check and the transition so a concurrent
            // ingest for this resource lands entirely before or after.
            let series = series.lock();
            let recent = series.recent_for_metric(&alert.metric, needed);
            if recent.len() >= needed && recent.iter().all(|m| !rules::evaluate(&rule, m.value)) {
                resolved.extend(self.alerts.resolve_alert(&key, &alert.id, now));
            }
        }

        if resolved.is_empty() {
            tracing::debug!("Resolution sweep found nothing to resolve");
        } else {
            tracing::info!(resolved = resolved.len(), "Resolution sweep completed");
        }
        let count = resolved.len();
        self.publish_resolved(resolved);
        count
    }

    /// Scores every resource with enough samples. A detector failure for
    /// one resource is logged and the sweep moves on. Returns the number of
    /// anomaly alerts raised.
    pub async fn run_anomaly_sweep(&self) -> usize {
        let mut raised = 0;
        for resource_id in self.buffer.resource_ids() {
            let window = self.buffer.recent(&resource_id, self.config.anomaly_window);
            if window.len() < self.config.anomaly_min_samples {
                continue;
            }

            let anomalies = match self
                .detector
                .detect_anomalies(&resource_id, &window, self.config.anomaly_sensitivity)
                .await
            {
                Ok(anomalies) => anomalies,
                Err(e) => {
                    tracing::warn!(resource_id = %resource_id, error = %e, "Anomaly detection failed");
                    continue;
                }
            };

            let now = self.clock.now();
            for anomaly in &anomalies {
                if let Some(alert) = self.alerts.raise_anomaly(&resource_id, anomaly, now) {
                    self.dispatcher
                        .publish(&AlertEvent::new(AlertEventKind::Triggered, alert, now));
                    raised += 1;
                }
            }

            let reported: HashSet<&str> = anomalies.iter().map(|a| a.metric.as_str()).collect();
            let prefix = format!("{ANOMALY_RULE_ID}:");
            let cleared: Vec<Alert> = self
                .alerts
                .live_anomaly_keys(&resource_id)
                .into_iter()
                .filter(|(rule, _)| {
                    rule.strip_prefix(&prefix)
                        .is_some_and(|metric| !reported.contains(metric))
                })
                .filter_map(|key| self.alerts.resolve(&key, now))
                .collect();
            self.publish_resolved(cleared);
        }

        if raised > 0 {
            tracing::info!(raised, "Anomaly sweep completed");
        }
        raised
    }

    /// Drops samples older than the retention horizon. Returns how many.
    pub fn run_retention_sweep(&self) -> usize {
        let now = self.clock.now();
        let cutoff = now
            .checked_sub_signed(self.config.retention())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let pruned = self.buffer.prune_all(cutoff);
        if pruned > 0 {
            tracing::info!(pruned, cutoff = %cutoff, "Retention sweep completed");
        }
        pruned
    }

    fn publish_resolved(&self, alerts: Vec<Alert>) {
        for alert in alerts {
            let at = alert.resolved_at.unwrap_or_else(|| self.clock.now());
            self.dispatcher
                .publish(&AlertEvent::new(AlertEventKind::Resolved, alert, at));
        }
    }

    // ── Lifecycle ──

    /// Starts all three sweeps.
    pub fn start(self: &Arc<Self>) {
        for kind in SweepKind::ALL {
            self.start_sweep(kind);
        }
    }

    /// Signals every sweep to stop before its next firing.
    pub fn stop(&self) {
        self.scheduler.stop_all();
    }

    pub fn start_sweep(self: &Arc<Self>, kind: SweepKind) -> bool {
        let engine: Weak<Self> = Arc::downgrade(self);
        let period = self.config.sweep_interval(kind);
        self.scheduler.start(kind, period, move || {
            let engine = engine.clone();
            async move {
                let Some(engine) = engine.upgrade() else {
                    return;
                };
                match kind {
                    SweepKind::Resolution => {
                        engine.run_resolution_sweep();
                    }
                    SweepKind::Anomaly => {
                        engine.run_anomaly_sweep().await;
                    }
                    SweepKind::Retention => {
                        engine.run_retention_sweep();
                    }
                }
            }
        })
    }

    pub fn stop_sweep(&self, kind: SweepKind) -> bool {
        self.scheduler.stop(kind)
    }

    pub fn is_running(&self, kind: SweepKind) -> bool {
        self.scheduler.is_running(kind)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            resources: self.buffer.resource_count(),
            samples: self.buffer.sample_count(),
            rules: self.rules.len(),
            enabled_rules: self.rules.enabled().len(),
            active_alerts: self.alerts.active_count(),
            history_len: self.alerts.history_len(),
        }
    }
}
