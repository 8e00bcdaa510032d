//! Deadline wrapper for network steps.
//!
//! Every suspension point in checkout runs through [`bounded`] or
//! [`bounded_try`] with its own budget. The budget is independent of any
//! transport timeout the underlying client applies; whichever fires first
//! wins. Expiry drops the inner future, which is the only cancellation
//! checkout performs.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// A step ran past its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{operation} timed out after {}s", budget.as_secs_f32())]
pub struct TimedOut {
    pub operation: &'static str,
    pub budget: Duration,
}

/// Outcome of a fallible step with a budget.
#[derive(Debug, Error)]
pub enum BoundedError<E> {
    #[error(transparent)]
    TimedOut(TimedOut),
    #[error("{0}")]
    Failed(E),
}

impl<E> BoundedError<E> {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    /// Map the inner failure, keeping timeouts as they are.
    pub fn map_failed<F>(self, f: impl FnOnce(E) -> F) -> BoundedError<F> {
        match self {
            Self::TimedOut(t) => BoundedError::TimedOut(t),
            Self::Failed(e) => BoundedError::Failed(f(e)),
        }
    }
}

/// Run `future` with a deadline of `budget`.
///
/// # Errors
///
/// Returns `TimedOut` if the deadline passes first.
pub async fn bounded<F>(
    operation: &'static str,
    budget: Duration,
    future: F,
) -> Result<F::Output, TimedOut>
where
    F: Future,
{
    if let Ok(output) = tokio::time::timeout(budget, future).await {
        Ok(output)
    } else {
        tracing::warn!(
            step = operation,
            budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            "Step exceeded its budget"
        );
        Err(TimedOut { operation, budget })
    }
}

/// Run a fallible `future` with a deadline, flattening the two failure kinds.
///
/// # Errors
///
/// Returns `BoundedError::TimedOut` on expiry and `BoundedError::Failed`
/// when the step itself fails.
pub async fn bounded_try<T, E, F>(
    operation: &'static str,
    budget: Duration,
    future: F,
) -> Result<T, BoundedError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    bounded(operation, budget, future)
        .await
        .map_err(BoundedError::TimedOut)?
        .map_err(BoundedError::Failed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_completes_within_budget() {
        let value = bounded("lookup", Duration::from_secs(2), async {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            7
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let err = bounded("session", Duration::from_secs(2), async {
            tokio::time::sleep(Duration::from_secs(3)).await;
        })
        .await
        .unwrap_err();
        assert_eq!(err.operation, "session");
        assert_eq!(err.budget, Duration::from_secs(2));
        assert_eq!(err.to_string(), "session timed out after 2s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_try_separates_failure_kinds() {
        let failed: Result<(), _> = bounded_try("coupon", Duration::from_secs(5), async {
            Err::<(), _>("rejected")
        })
        .await;
        assert!(matches!(failed, Err(BoundedError::Failed("rejected"))));

        let timed_out = bounded_try("coupon", Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(6)).await;
            Ok::<_, &str>(())
        })
        .await
        .unwrap_err();
        assert!(timed_out.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_drops_inner_future() {
        struct SetOnDrop(std::sync::Arc<std::sync::atomic::AtomicBool>);
        impl Drop for SetOnDrop {
            fn drop(&mut self) {
                self.0.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let dropped = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let guard = SetOnDrop(dropped.clone());
        let result = bounded("insert", Duration::from_secs(1), async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        })
        .await;

        assert!(result.is_err());
        assert!(dropped.load(std::sync::atomic::Ordering::SeqCst));
    }
}
