use super::MonitoringRule;
use crate::error::{AlertError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Rules by id. Reads happen on every ingested sample, writes only on
/// administrative calls.
#[derive(Default)]
pub struct RuleStore {
    rules: RwLock<HashMap<String, Arc<MonitoringRule>>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces, returning the previous definition.
    pub fn upsert(&self, rule: MonitoringRule) -> Option<Arc<MonitoringRule>> {
        self.rules.write().insert(rule.id.clone(), Arc::new(rule))
    }

    pub fn remove(&self, id: &str) -> Option<Arc<MonitoringRule>> {
        self.rules.write().remove(id)
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let mut rules = self.rules.write();
        let rule = rules
            .get_mut(id)
            .ok_or_else(|| AlertError::RuleNotFound(id.to_string()))?;
        if rule.enabled != enabled {
            Arc::make_mut(rule).enabled = enabled;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<MonitoringRule>> {
        self.rules.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<Arc<MonitoringRule>> {
        self.rules.read().values().cloned().collect()
    }

    pub fn enabled(&self) -> Vec<Arc<MonitoringRule>> {
        self.rules
            .read()
            .values()
            .filter(|r| r.enabled)
            .cloned()
            .collect()
    }

    /// Enabled rules watching `metric_name` on `resource_id`.
    pub fn matching(&self, resource_id: &str, metric_name: &str) -> Vec<Arc<MonitoringRule>> {
        self.rules
            .read()
            .values()
            .filter(|r| r.applies_to(resource_id, metric_name))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}
