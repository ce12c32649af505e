use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single sample reported for a resource. Never mutated once buffered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub resource_id: String,
    pub metric_name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    pub fn new(
        resource_id: impl Into<String>,
        metric_name: impl Into<String>,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            metric_name: metric_name.into(),
            value,
            timestamp,
        }
    }
}

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use cloudguard_common::types::Severity;
///
/// let sev: Severity = "HIGH".parse().unwrap();
/// assert_eq!(sev, Severity::High);
/// assert_eq!(sev.to_string(), "high");
/// assert!(Severity::Critical > Severity::Low);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    /// Active and acknowledged alerts both occupy the active index.
    pub fn is_live(&self) -> bool {
        matches!(self, AlertStatus::Active | AlertStatus::Acknowledged)
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "active"),
            AlertStatus::Acknowledged => write!(f, "acknowledged"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// A materialized breach of a rule for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub resource_id: String,
    pub metric: String,
    pub observed_value: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub triggered_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub status: AlertStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertEventKind {
    Triggered,
    Acknowledged,
    Resolved,
}

impl std::fmt::Display for AlertEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertEventKind::Triggered => write!(f, "triggered"),
            AlertEventKind::Acknowledged => write!(f, "acknowledged"),
            AlertEventKind::Resolved => write!(f, "resolved"),
        }
    }
}

/// A lifecycle transition, carrying a snapshot of the alert taken right
/// after the transition was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertEventKind,
    pub alert: Alert,
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(kind: AlertEventKind, alert: Alert, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            alert,
            timestamp,
        }
    }

    pub fn severity(&self) -> Severity {
        self.alert.severity
    }
}

/// Side-effecting action a rule asks for when it triggers.
///
/// # Examples
///
/// ```
/// use cloudguard_common::types::ActionKind;
///
/// assert_eq!("auto-scale".parse::<ActionKind>().unwrap(), ActionKind::AutoScale);
/// assert_eq!(ActionKind::AutoScale.to_string(), "auto_scale");
/// assert!("reboot".parse::<ActionKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Notify,
    Escalate,
    Page,
    #[serde(alias = "auto-scale", alias = "autoscale")]
    AutoScale,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Notify,
        ActionKind::Escalate,
        ActionKind::Page,
        ActionKind::AutoScale,
    ];
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::Notify => write!(f, "notify"),
            ActionKind::Escalate => write!(f, "escalate"),
            ActionKind::Page => write!(f, "page"),
            ActionKind::AutoScale => write!(f, "auto_scale"),
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "notify" => Ok(ActionKind::Notify),
            "escalate" => Ok(ActionKind::Escalate),
            "page" => Ok(ActionKind::Page),
            "auto_scale" | "auto-scale" | "autoscale" => Ok(ActionKind::AutoScale),
            _ => Err(format!("unknown action: {s}")),
        }
    }
}

/// A scored deviation reported by an anomaly detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub metric: String,
    pub value: f64,
    pub expected_value: f64,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_kind_serde_accepts_dashed_alias() {
        let kinds: Vec<ActionKind> =
            serde_json::from_str(r#"["notify", "auto-scale", "auto_scale"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![ActionKind::Notify, ActionKind::AutoScale, ActionKind::AutoScale]
        );
    }

    #[test]
    fn alert_status_liveness() {
        assert!(AlertStatus::Active.is_live());
        assert!(AlertStatus::Acknowledged.is_live());
        assert!(!AlertStatus::Resolved.is_live());
    }

    #[test]
    fn severity_rejects_unknown() {
        let err = "urgent".parse::<Severity>().unwrap_err();
        assert!(err.contains("urgent"));
    }
}
