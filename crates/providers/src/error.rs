//! Normalized provider errors.

use larder_core::failure::FailureKind;

/// An error from a provider adapter, classified for the retry policy.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: FailureKind,
    pub message: String,
}

impl ProviderError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::ProviderTransient,
            message: message.into(),
        }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::ProviderTerminal,
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Infrastructure,
            message: message.into(),
        }
    }

    /// Whether the pipeline's retry policy applies.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Classify an HTTP status from a provider API.
    ///
    /// Rate limits and server errors are transient; auth and validation
    /// failures are terminal.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = format!("Provider API error ({status}): {body}");
        if status == 429 || status >= 500 {
            Self::transient(message)
        } else {
            Self::terminal(message)
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::transient(format!("Provider request failed: {err}"))
        } else {
            Self::terminal(format!("Provider request failed: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_transient() {
        assert_eq!(
            ProviderError::from_status(429, "slow down").kind,
            FailureKind::ProviderTransient
        );
    }

    #[test]
    fn server_errors_are_transient() {
        assert!(ProviderError::from_status(503, "").is_retryable());
    }

    #[test]
    fn auth_and_validation_are_terminal() {
        assert!(!ProviderError::from_status(401, "bad key").is_retryable());
        assert!(!ProviderError::from_status(400, "bad prompt").is_retryable());
    }
}
