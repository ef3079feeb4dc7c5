//! Failure classification for pipeline errors.
//!
//! Every failure crossing the pipeline boundary carries one of these kinds.
//! The kind alone decides whether the retry policy applies; the originating
//! layer (provider adapter, object store, persistence) is responsible for
//! picking the right kind before the error reaches the pipeline.

use serde::{Deserialize, Serialize};

/// Classification of a task failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bad input at a system boundary. Never retried.
    Validation,
    /// Rate limit, 5xx, or timeout from an external provider.
    ProviderTransient,
    /// Auth, content-policy, or malformed response from a provider.
    ProviderTerminal,
    /// Store or object-store failure.
    Infrastructure,
    /// Task exceeded its wall-clock budget.
    Timeout,
    /// Job was cancelled while the task was pending or in flight.
    Cancelled,
}

impl FailureKind {
    /// Whether the pipeline's retry policy applies to this kind.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ProviderTransient | Self::Infrastructure)
    }

    /// Stable lowercase name, used in error messages and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::ProviderTransient => "provider_transient",
            Self::ProviderTerminal => "provider_terminal",
            Self::Infrastructure => "infrastructure",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
