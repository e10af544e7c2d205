//! # quotaguard
//!
//! Quota-aware, retrying client wrapper for providers that meter API calls
//! against a fixed daily budget of quota units.
//!
//! Three layers, leaves first: [`QuotaLedger`] stores per-day, per-operation
//! usage durably; [`QuotaManager`] enforces the daily budget inside a single
//! critical section; [`RateLimitedClient`] wraps a caller-supplied operation
//! with precheck, failure classification, exponential backoff, and
//! consume-on-success accounting. The HTTP transport itself is supplied by
//! the caller as an async closure.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quotaguard::{CostTable, QuotaManager, RateLimitedClient, RetryPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), quotaguard::Error> {
//!     let manager = Arc::new(
//!         QuotaManager::builder()
//!             .path("data/quota_usage.json")
//!             .daily_limit(10_000)
//!             .costs(CostTable::youtube_defaults())
//!             .build(),
//!     );
//!     let client = RateLimitedClient::new(manager, RetryPolicy::default());
//!
//!     let ids: Vec<String> = client
//!         .call("search.list", || async {
//!             // caller-supplied transport goes here
//!             Ok(vec!["video-id".to_string()])
//!         })
//!         .await?;
//!
//!     println!(
//!         "{} results, {} units remaining today",
//!         ids.len(),
//!         client.manager().remaining()
//!     );
//!     Ok(())
//! }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod client;
pub mod quota;

pub use client::{BACKOFF_MULTIPLIER, CallOutcome, RateLimitedClient, RetryPolicy};
pub use quota::{
    CostTable, CostTableBuilder, DEFAULT_DAILY_LIMIT, DEFAULT_OPERATION_COST,
    DEFAULT_RETENTION_DAYS, DayKey, DayUsage, LedgerConfig, LedgerState, QuotaLedger, QuotaManager,
    QuotaManagerBuilder,
};

/// Error type for quotaguard operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Provider returned an error response.
    #[error("API error (HTTP {status}): {message}", status = status.map(|s| s.to_string()).unwrap_or_else(|| "unknown".into()))]
    Api {
        message: String,
        status: Option<u16>,
        error_type: Option<String>,
    },

    /// Provider reported rate limiting.
    #[error("Rate limit exceeded{}", match retry_after {
        Some(d) => format!(", retry in {:.0}s", d.as_secs_f64()),
        None => String::new(),
    })]
    RateLimit {
        retry_after: Option<std::time::Duration>,
    },

    /// Transport-level failure, funneled in by the caller-supplied operation.
    #[error("Network request failed: {0}")]
    Network(String),

    /// The daily quota budget was or would be exceeded.
    #[error("Quota exceeded for {operation}: cost {cost} exceeds remaining {remaining} units")]
    QuotaExceeded {
        operation: String,
        cost: u64,
        remaining: u64,
    },

    /// Ledger file operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ledger serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn api(message: impl Into<String>, status: u16) -> Self {
        Error::Api {
            message: message.into(),
            status: Some(status),
            error_type: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Error::Network(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimit { .. }
                | Error::Api {
                    status: Some(429 | 500..=599),
                    ..
                }
        )
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => *status,
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Error::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::api("backend error", 503);
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("backend error"));

        let err = Error::QuotaExceeded {
            operation: "search.list".into(),
            cost: 100,
            remaining: 40,
        };
        assert!(err.to_string().contains("search.list"));
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("40"));
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(Error::RateLimit { retry_after: None }.is_retryable());
        assert!(Error::api("server fell over", 500).is_retryable());
        assert!(Error::api("too many requests", 429).is_retryable());

        assert!(!Error::api("forbidden", 403).is_retryable());
        assert!(!Error::network("connection refused").is_retryable());
        assert!(
            !Error::QuotaExceeded {
                operation: "videos.list".into(),
                cost: 1,
                remaining: 0,
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_retry_after_accessor() {
        let d = std::time::Duration::from_secs(7);
        let err = Error::RateLimit {
            retry_after: Some(d),
        };
        assert_eq!(err.retry_after(), Some(d));
        assert_eq!(Error::api("nope", 500).retry_after(), None);
    }
}
