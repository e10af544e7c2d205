//! Quota-enforcing, retrying wrapper around caller-supplied API operations.
//!
//! The wrapper owns no transport. An operation is an async closure tagged
//! with the provider's operation name; the name drives cost lookup and
//! usage bucketing. Per logical call: precheck the budget, execute, classify
//! any failure, back off and retry transient ones, and charge quota only for
//! the attempt that ultimately succeeded.

mod outcome;
mod policy;

pub use outcome::CallOutcome;
pub use policy::{BACKOFF_MULTIPLIER, RetryPolicy};

use std::future::Future;
use std::sync::Arc;

use crate::quota::QuotaManager;
use crate::{Error, Result};

/// Wraps caller-supplied operations with budget enforcement and retry.
///
/// Cheap to clone; clones share the same [`QuotaManager`].
#[derive(Debug, Clone)]
pub struct RateLimitedClient {
    manager: Arc<QuotaManager>,
    policy: RetryPolicy,
}

impl RateLimitedClient {
    pub fn new(manager: Arc<QuotaManager>, policy: RetryPolicy) -> Self {
        Self { manager, policy }
    }

    pub fn manager(&self) -> &Arc<QuotaManager> {
        &self.manager
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `op` under quota enforcement.
    ///
    /// If today's budget cannot cover `operation`, returns
    /// [`Error::QuotaExceeded`] without invoking `op` at all. Otherwise `op`
    /// runs up to `max_attempts` times: rate-limit and 5xx-class failures
    /// back off geometrically (honoring any provider retry-after hint) and
    /// retry; everything else is surfaced immediately. Quota is consumed
    /// exactly once, and only when an attempt succeeds. A call that
    /// exhausts its retries or fails fatally leaves the ledger unchanged.
    pub async fn call<F, Fut, T>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.manager.can_execute(operation) {
            let cost = self.manager.operation_cost(operation);
            let remaining = self.manager.remaining();
            tracing::debug!(operation, cost, remaining, "precheck rejected call");
            return Err(Error::QuotaExceeded {
                operation: operation.to_string(),
                cost,
                remaining,
            });
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1u32;
        loop {
            let outcome = CallOutcome::classify(op().await);
            match outcome {
                CallOutcome::Success(value) => {
                    // Concurrent callers may have drained the budget since
                    // the precheck; consume is the enforcement point and its
                    // rejection wins over the response.
                    self.manager.consume(operation)?;
                    return Ok(value);
                }
                outcome if outcome.is_retryable() && attempt < max_attempts => {
                    let backoff = self.policy.delay_for(attempt);
                    let delay = match outcome.retry_after() {
                        Some(hint) => hint.max(backoff),
                        None => backoff,
                    };
                    tracing::debug!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        kind = outcome.kind(),
                        "transient failure, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                outcome => {
                    tracing::debug!(
                        operation,
                        attempt,
                        kind = outcome.kind(),
                        "call failed without further retries"
                    );
                    return outcome.into_result();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::quota::CostTable;
    use tempfile::TempDir;

    fn client(tmp: &TempDir, limit: u64, policy: RetryPolicy) -> RateLimitedClient {
        let manager = Arc::new(
            QuotaManager::builder()
                .path(tmp.path().join("usage.json"))
                .daily_limit(limit)
                .costs(CostTable::youtube_defaults())
                .build(),
        );
        RateLimitedClient::new(manager, policy)
    }

    #[tokio::test]
    async fn test_success_consumes_quota_once() {
        let tmp = TempDir::new().unwrap();
        let c = client(&tmp, 10_000, RetryPolicy::default());

        let value = c
            .call("search.list", || async { Ok("hits") })
            .await
            .unwrap();
        assert_eq!(value, "hits");
        assert_eq!(c.manager().usage_today().total, 100);
    }

    #[tokio::test]
    async fn test_precheck_rejects_without_invoking_operation() {
        let tmp = TempDir::new().unwrap();
        let c = client(&tmp, 99, RetryPolicy::default());
        let calls = AtomicU32::new(0);

        let result = c
            .call("search.list", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert!(matches!(result, Err(Error::QuotaExceeded { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(c.manager().usage_today().total, 0);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let tmp = TempDir::new().unwrap();
        let c = client(&tmp, 10_000, RetryPolicy::default());
        let calls = AtomicU32::new(0);

        let result: Result<()> = c
            .call("videos.list", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::network("dns failure")) }
            })
            .await;

        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.manager().usage_today().total, 0);
    }

    #[tokio::test]
    async fn test_provider_403_surfaces_unchanged_without_retry() {
        let tmp = TempDir::new().unwrap();
        let c = client(&tmp, 10_000, RetryPolicy::default());
        let calls = AtomicU32::new(0);

        let result: Result<()> = c
            .call("videos.list", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::api("daily quota exceeded", 403)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match result {
            Err(Error::Api {
                status: Some(403),
                message,
                ..
            }) => assert_eq!(message, "daily quota exceeded"),
            other => panic!("expected the original 403 back, got {other:?}"),
        }
    }
}
