use super::MonitoringRule;
use chrono::{DateTime, Utc};
use cloudguard_common::types::Metric;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    #[serde(alias = "gt")]
    GreaterThan,
    #[serde(alias = "gte")]
    GreaterEqual,
    #[serde(alias = "lt")]
    LessThan,
    #[serde(alias = "lte")]
    LessEqual,
    #[serde(alias = "eq")]
    Equal,
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greater_than" | "gt" => Ok(Self::GreaterThan),
            "greater_equal" | "gte" => Ok(Self::GreaterEqual),
            "less_than" | "lt" => Ok(Self::LessThan),
            "less_equal" | "lte" => Ok(Self::LessEqual),
            "equal" | "eq" => Ok(Self::Equal),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GreaterThan => write!(f, "greater_than"),
            Self::GreaterEqual => write!(f, "greater_equal"),
            Self::LessThan => write!(f, "less_than"),
            Self::LessEqual => write!(f, "less_equal"),
            Self::Equal => write!(f, "equal"),
        }
    }
}

impl CompareOp {
    /// Exact comparison; `Equal` has no epsilon tolerance.
    #[allow(clippy::float_cmp)]
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::GreaterEqual => value >= threshold,
            Self::LessThan => value < threshold,
            Self::LessEqual => value <= threshold,
            Self::Equal => value == threshold,
        }
    }

    /// Phrase used in alert messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::GreaterThan => "above",
            Self::GreaterEqual => "at or above",
            Self::LessThan => "below",
            Self::LessEqual => "at or below",
            Self::Equal => "equal to",
        }
    }
}

/// Whether `value` satisfies the rule's trigger condition.
///
/// # Examples
///
/// ```
/// use cloudguard_alert::rules::{evaluate, CompareOp, MonitoringRule};
///
/// let rule = MonitoringRule::new("cpu-high", "cpu", CompareOp::GreaterThan, 80.0);
/// assert!(evaluate(&rule, 85.0));
/// assert!(!evaluate(&rule, 80.0));
/// ```
pub fn evaluate(rule: &MonitoringRule, value: f64) -> bool {
    rule.operator.check(value, rule.threshold)
}

/// Whether the rule fires for `latest`, given the resource's buffered
/// samples (which include `latest`).
///
/// With a zero sustain duration only `latest` is checked. Otherwise every
/// sample of the rule's metric inside `[latest - sustain, latest]` must
/// breach.
pub fn sustained<'a>(
    rule: &MonitoringRule,
    samples: impl IntoIterator<Item = &'a Metric>,
    latest: &Metric,
) -> bool {
    if !evaluate(rule, latest.value) {
        return false;
    }
    if rule.sustain_duration.is_zero() {
        return true;
    }

    let cutoff = chrono::Duration::from_std(rule.sustain_duration)
        .ok()
        .and_then(|span| latest.timestamp.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    samples
        .into_iter()
        .filter(|m| m.metric_name == rule.metric)
        .filter(|m| m.timestamp >= cutoff && m.timestamp <= latest.timestamp)
        .all(|m| evaluate(rule, m.value))
}
