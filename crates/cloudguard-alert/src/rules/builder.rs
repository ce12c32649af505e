use super::{CompareOp, MonitoringRule};
use crate::error::AlertError;
use cloudguard_common::types::{ActionKind, Severity};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// String-typed rule definition as it appears in seed files and
/// administrative requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub id: String,
    /// Defaults to the id.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub resource_scope: Option<String>,
    pub metric: String,
    pub operator: String,
    pub threshold: f64,
    #[serde(default)]
    pub sustain_secs: u64,
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub actions: Vec<String>,
}

fn default_severity() -> String {
    "medium".to_string()
}

fn default_enabled() -> bool {
    true
}

impl TryFrom<RuleConfig> for MonitoringRule {
    type Error = AlertError;

    fn try_from(config: RuleConfig) -> Result<Self, Self::Error> {
        let operator: CompareOp = config
            .operator
            .trim()
            .to_lowercase()
            .parse()
            .map_err(|_| AlertError::UnknownOperator(config.operator.clone()))?;
        let severity: Severity = config
            .severity
            .trim()
            .parse()
            .map_err(|_| AlertError::UnknownSeverity(config.severity.clone()))?;

        let mut actions = Vec::with_capacity(config.actions.len());
        for tag in &config.actions {
            let kind: ActionKind = tag
                .trim()
                .parse()
                .map_err(|_| AlertError::UnknownAction(tag.clone()))?;
            actions.push(kind);
        }

        let name = config
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| config.id.clone());

        let rule = MonitoringRule {
            id: config.id,
            name,
            resource_scope: config.resource_scope,
            metric: config.metric,
            operator,
            threshold: config.threshold,
            sustain_duration: Duration::from_secs(config.sustain_secs),
            severity,
            enabled: config.enabled,
            actions: Vec::new(),
        }
        .with_actions(actions);

        rule.validate()?;
        Ok(rule)
    }
}
