use crate::config::RulesSeedFile;
use anyhow::Context;
use cloudguard_alert::rules::RuleConfig;
use cloudguard_alert::MonitoringEngine;

pub fn load_seed_file(path: &str) -> anyhow::Result<RulesSeedFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules file '{path}'"))?;
    let seed: RulesSeedFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse rules file '{path}'"))?;
    Ok(seed)
}

/// Registers every valid rule. Invalid entries are logged and skipped.
pub fn apply_rules(engine: &MonitoringEngine, rules: Vec<RuleConfig>) -> usize {
    let total = rules.len();
    let mut inserted = 0usize;
    for rule in rules {
        let id = rule.id.clone();
        match engine.add_rule_config(rule) {
            Ok(()) => inserted += 1,
            Err(e) => {
                tracing::warn!(rule_id = %id, error = %e, "Skipping invalid rule in seed file");
            }
        }
    }
    tracing::info!(inserted, total, "Alert rules loaded from seed file");
    inserted
}

pub fn init_rules_from_file(engine: &MonitoringEngine, path: &str) -> anyhow::Result<usize> {
    let seed = load_seed_file(path)?;
    Ok(apply_rules(engine, seed.rules))
}
