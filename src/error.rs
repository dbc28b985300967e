use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid hook payload: {0}")]
    InvalidPayload(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{channel} delivery failed: {reason}")]
    Delivery { channel: String, reason: String },

    #[error("license rejected by the notification relay")]
    LicenseRejected,
}

impl NotifyError {
    pub fn delivery(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Delivery {
            channel: channel.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` when the failure happened while handing a rendered
    /// notification to its transport, as opposed to building it.
    pub fn is_delivery(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Delivery { .. } | Self::LicenseRejected
        )
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_display() {
        let err = NotifyError::delivery("webhook", "HTTP 502");
        assert_eq!(err.to_string(), "webhook delivery failed: HTTP 502");
        assert!(err.is_delivery());
    }

    #[test]
    fn test_payload_error_is_not_delivery() {
        let err = NotifyError::InvalidPayload("expected an object".into());
        assert!(!err.is_delivery());
    }
}
