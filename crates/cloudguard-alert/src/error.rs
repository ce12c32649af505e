use cloudguard_common::types::AlertStatus;

/// Errors returned by the administrative and alert surfaces of the engine.
///
/// Evaluation misses (unknown metric names, too few samples to resolve) are
/// never errors; they are silent no-ops.
///
/// # Examples
///
/// ```rust
/// use cloudguard_alert::error::AlertError;
///
/// let err = AlertError::UnknownOperator("between".to_string());
/// assert!(err.to_string().contains("between"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// A rule is missing a required field or carries an invalid value.
    #[error("Alert: invalid rule: {0}")]
    InvalidRule(String),

    #[error("Alert: unknown comparison operator '{0}'")]
    UnknownOperator(String),

    #[error("Alert: unknown severity '{0}'")]
    UnknownSeverity(String),

    #[error("Alert: unknown action '{0}'")]
    UnknownAction(String),

    #[error("Alert: rule '{0}' not found")]
    RuleNotFound(String),

    #[error("Alert: alert '{0}' not found")]
    AlertNotFound(String),

    /// The requested lifecycle transition is not allowed from `status`.
    #[error("Alert: alert '{id}' cannot be acknowledged while {status}")]
    InvalidTransition { id: String, status: AlertStatus },

    /// A sample was rejected before touching any engine state.
    #[error("Alert: invalid sample: {0}")]
    InvalidSample(String),
}

pub type Result<T> = std::result::Result<T, AlertError>;
