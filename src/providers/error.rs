//! Provider-tagged upstream errors.

use std::time::Duration;

use thiserror::Error;

/// Longest slice of an upstream error body kept in [`ProviderError::Rejected`].
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Network or transport failure reaching the provider.
    #[error("{provider} unavailable: {message}")]
    Unavailable { provider: String, message: String },
    /// Provider answered with a non-success status.
    #[error("{provider} returned HTTP {status}: {body}")]
    Rejected {
        provider: String,
        status: u16,
        body: String,
    },
    /// Provider answered 2xx but the payload was not valid JSON.
    #[error("{provider} returned a malformed payload: {message}")]
    Malformed { provider: String, message: String },
    /// Provider did not answer within its deadline.
    #[error("{provider} timed out after {}ms", .timeout.as_millis())]
    TimedOut { provider: String, timeout: Duration },
}

impl ProviderError {
    pub const KIND_UNAVAILABLE: &'static str = "unavailable";
    pub const KIND_REJECTED: &'static str = "rejected";
    pub const KIND_MALFORMED: &'static str = "malformed";
    pub const KIND_TIMEOUT: &'static str = "timeout";

    pub fn unavailable(provider: &str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn rejected(provider: &str, status: u16, body: &str) -> Self {
        Self::Rejected {
            provider: provider.to_string(),
            status,
            body: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS).to_string(),
        }
    }

    pub fn malformed(provider: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn timed_out(provider: &str, timeout: Duration) -> Self {
        Self::TimedOut {
            provider: provider.to_string(),
            timeout,
        }
    }

    /// Map a reqwest transport error, keeping client-side timeouts distinct.
    pub fn from_reqwest(provider: &str, err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::timed_out(provider, timeout)
        } else {
            Self::unavailable(provider, err.to_string())
        }
    }

    /// Name of the provider that failed.
    pub fn provider(&self) -> &str {
        match self {
            Self::Unavailable { provider, .. }
            | Self::Rejected { provider, .. }
            | Self::Malformed { provider, .. }
            | Self::TimedOut { provider, .. } => provider,
        }
    }

    /// Stable identifier used in error markers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => Self::KIND_UNAVAILABLE,
            Self::Rejected { .. } => Self::KIND_REJECTED,
            Self::Malformed { .. } => Self::KIND_MALFORMED,
            Self::TimedOut { .. } => Self::KIND_TIMEOUT,
        }
    }

    /// Whether a second attempt has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Rejected { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            Self::Malformed { .. } | Self::TimedOut { .. } => false,
        }
    }
}

/// Truncate to at most `max` characters without splitting a UTF-8 sequence.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
