//! Per-attempt failure classification.
//!
//! One classification step maps the raw result of an attempt onto a tagged
//! variant; the retry loop dispatches on the variant and never inspects raw
//! status codes itself. The original error travels inside the variant and is
//! surfaced to the caller unchanged.

use std::time::Duration;

use crate::Error;

/// Classified result of a single call attempt.
#[derive(Debug)]
pub enum CallOutcome<T> {
    /// The attempt succeeded; quota is charged for it.
    Success(T),
    /// Budget rejected locally, or a provider quota/permission rejection
    /// (HTTP 401/403). Never retried.
    QuotaExceeded(Error),
    /// Provider-reported rate limiting (HTTP 429 or an explicit rate-limit
    /// error), possibly with a retry-after hint. Retryable.
    RateLimited {
        error: Error,
        retry_after: Option<Duration>,
    },
    /// Provider-side transient failure (HTTP 5xx). Retryable.
    TransientServerError(Error),
    /// Permanent or unclassified failure. Never retried.
    Fatal(Error),
}

impl<T> CallOutcome<T> {
    /// Classify the raw result of one attempt.
    pub fn classify(result: crate::Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::from_error(error),
        }
    }

    fn from_error(error: Error) -> Self {
        match &error {
            Error::QuotaExceeded { .. } => Self::QuotaExceeded(error),
            Error::RateLimit { retry_after } => {
                let retry_after = *retry_after;
                Self::RateLimited { error, retry_after }
            }
            Error::Api {
                status: Some(429), ..
            } => Self::RateLimited {
                error,
                retry_after: None,
            },
            Error::Api {
                status: Some(401 | 403),
                ..
            } => Self::QuotaExceeded(error),
            Error::Api {
                status: Some(500..=599),
                ..
            } => Self::TransientServerError(error),
            _ => Self::Fatal(error),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::TransientServerError(_)
        )
    }

    /// Retry-after hint carried by a rate-limit rejection, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Short tag for structured logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::RateLimited { .. } => "rate_limited",
            Self::TransientServerError(_) => "server_error",
            Self::Fatal(_) => "fatal",
        }
    }

    /// Unwrap into the caller-facing result, handing back the original
    /// error unchanged.
    pub fn into_result(self) -> crate::Result<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::QuotaExceeded(e)
            | Self::RateLimited { error: e, .. }
            | Self::TransientServerError(e)
            | Self::Fatal(e) => Err(e),
        }
    }
}
