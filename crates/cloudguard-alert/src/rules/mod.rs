//! Rule definitions, evaluation and storage.

pub mod builder;
pub mod store;
pub mod threshold;

pub use builder::RuleConfig;
pub use store::RuleStore;
pub use threshold::{evaluate, CompareOp};

use crate::error::{AlertError, Result};
use crate::lifecycle::ANOMALY_RULE_ID;
use cloudguard_common::types::{ActionKind, Severity};
use std::time::Duration;

/// A threshold condition over one metric, optionally scoped to a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringRule {
    pub id: String,
    pub name: String,
    /// Exact resource id or glob pattern. `None` and `"*"` match everything.
    pub resource_scope: Option<String>,
    pub metric: String,
    pub operator: CompareOp,
    pub threshold: f64,
    pub sustain_duration: Duration,
    pub severity: Severity,
    pub enabled: bool,
    /// Ordered, without duplicates.
    pub actions: Vec<ActionKind>,
}

impl MonitoringRule {
    /// An enabled, unscoped, medium-severity rule with no actions.
    pub fn new(id: &str, metric: &str, operator: CompareOp, threshold: f64) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            resource_scope: None,
            metric: metric.to_string(),
            operator,
            threshold,
            sustain_duration: Duration::ZERO,
            severity: Severity::Medium,
            enabled: true,
            actions: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.resource_scope = Some(scope.to_string());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_sustain(mut self, sustain: Duration) -> Self {
        self.sustain_duration = sustain;
        self
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = ActionKind>) -> Self {
        self.actions.clear();
        for action in actions {
            if !self.actions.contains(&action) {
                self.actions.push(action);
            }
        }
        self
    }

    pub fn matches_resource(&self, resource_id: &str) -> bool {
        match self.resource_scope.as_deref() {
            None | Some("*") => true,
            Some(scope) => scope == resource_id || glob_match::glob_match(scope, resource_id),
        }
    }

    pub fn applies_to(&self, resource_id: &str, metric_name: &str) -> bool {
        self.enabled && self.metric == metric_name && self.matches_resource(resource_id)
    }

    /// Rejects rules that could never be stored consistently.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AlertError::InvalidRule("id is required".to_string()));
        }
        if self.id == ANOMALY_RULE_ID {
            return Err(AlertError::InvalidRule(format!(
                "'{ANOMALY_RULE_ID}' is reserved for anomaly alerts"
            )));
        }
        if self.name.trim().is_empty() {
            return Err(AlertError::InvalidRule(format!("rule '{}': name is required", self.id)));
        }
        if self.metric.trim().is_empty() {
            return Err(AlertError::InvalidRule(format!("rule '{}': metric is required", self.id)));
        }
        if !self.threshold.is_finite() {
            return Err(AlertError::InvalidRule(format!(
                "rule '{}': threshold must be finite",
                self.id
            )));
        }
        if matches!(self.resource_scope.as_deref(), Some(s) if s.trim().is_empty()) {
            return Err(AlertError::InvalidRule(format!(
                "rule '{}': resource scope must not be empty",
                self.id
            )));
        }
        Ok(())
    }
}
