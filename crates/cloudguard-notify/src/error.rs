/// Failures raised while building or calling notification collaborators.
///
/// Delivery itself (`NotificationChannel::send`, action handlers) reports
/// through `anyhow`; this type covers channel construction and the
/// autoscaler client.
///
/// ```rust
/// use cloudguard_notify::error::NotifyError;
///
/// let err = NotifyError::InvalidConfig("webhook: urls must not be empty".to_string());
/// assert!(err.to_string().contains("urls"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("bad channel settings: {0}")]
    InvalidConfig(String),

    #[error("no channel plugin named '{0}'")]
    UnknownChannelType(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The remote end answered with a non-2xx status.
    #[error("{service} responded {status}: {body}")]
    ApiError {
        service: String,
        status: u16,
        body: String,
    },
}

pub type Result<T> = std::result::Result<T, NotifyError>;
