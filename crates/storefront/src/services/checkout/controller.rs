//! Per-session checkout state machine.
//!
//! ```text
//!            submit                 Ok
//!   Idle ───────────▶ Validating ─────────▶ Ready
//!    ▲                    │  Err (timeout)
//!    │ cancelled          ├───────────────▶ TimedOut
//!    └────────────────────┤  Err (other)
//!                         └───────────────▶ Error
//! ```
//!
//! Any settled phase accepts a new submit. Only one submit runs at a time;
//! the processing flag is released by a drop guard so a cancelled request
//! cannot wedge the session.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use tokio::sync::watch;

use saffron_core::OrderNumber;

use super::{CheckoutError, CheckoutReceipt};

/// Where a session's checkout currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CheckoutPhase {
    Idle,
    Validating,
    Ready {
        order_number: OrderNumber,
    },
    TimedOut {
        message: String,
        order_number: Option<OrderNumber>,
    },
    Error {
        message: String,
        order_number: Option<OrderNumber>,
    },
}

impl CheckoutPhase {
    fn settled(result: &Result<CheckoutReceipt, CheckoutError>) -> Self {
        match result {
            Ok(receipt) => Self::Ready {
                order_number: receipt.order_number.clone(),
            },
            Err(e) if e.is_timeout() => Self::TimedOut {
                message: e.user_message(),
                order_number: e.order_number().cloned(),
            },
            Err(e) => Self::Error {
                message: e.user_message(),
                order_number: e.order_number().cloned(),
            },
        }
    }
}

/// Serializes checkout submits for one session.
#[derive(Debug)]
pub struct CheckoutController {
    phase: watch::Sender<CheckoutPhase>,
    processing: AtomicBool,
}

impl Default for CheckoutController {
    fn default() -> Self {
        Self::new()
    }
}

struct ProcessingGuard<'a> {
    controller: &'a CheckoutController,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        // Still validating here means the submit future was dropped mid-flight
        self.controller.phase.send_if_modified(|phase| {
            let cancelled = *phase == CheckoutPhase::Validating;
            if cancelled {
                *phase = CheckoutPhase::Idle;
            }
            cancelled
        });
        self.controller.processing.store(false, Ordering::Release);
    }
}

impl CheckoutController {
    #[must_use]
    pub fn new() -> Self {
        let (phase, _) = watch::channel(CheckoutPhase::Idle);
        Self {
            phase,
            processing: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn phase(&self) -> CheckoutPhase {
        self.phase.borrow().clone()
    }

    /// Watch phase changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CheckoutPhase> {
        self.phase.subscribe()
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Run one checkout attempt, tracking its phase.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::AlreadyInProgress` without polling `attempt`
    /// if another submit is running; otherwise whatever `attempt` returns.
    pub async fn submit<F>(&self, attempt: F) -> Result<CheckoutReceipt, CheckoutError>
    where
        F: Future<Output = Result<CheckoutReceipt, CheckoutError>>,
    {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CheckoutError::AlreadyInProgress);
        }
        let _guard = ProcessingGuard { controller: self };

        self.phase.send_replace(CheckoutPhase::Validating);
        let result = attempt.await;
        self.phase.send_replace(CheckoutPhase::settled(&result));
        result
    }
}

/// Controllers keyed by session id, dropped after 30 idle minutes.
#[derive(Clone)]
pub struct CheckoutControllers {
    cache: Cache<String, Arc<CheckoutController>>,
}

impl Default for CheckoutControllers {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutControllers {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(Duration::from_secs(30 * 60))
            .build();
        Self { cache }
    }

    /// The session's controller, created on first use.
    pub async fn for_session(&self, session_id: &str) -> Arc<CheckoutController> {
        self.cache
            .get_with_by_ref(session_id, async { Arc::new(CheckoutController::new()) })
            .await
    }

    /// Current phase, `Idle` for sessions that never submitted.
    pub async fn phase(&self, session_id: &str) -> CheckoutPhase {
        self.cache
            .get(session_id)
            .await
            .map_or(CheckoutPhase::Idle, |controller| controller.phase())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use saffron_core::OrderTotals;
    use tokio::sync::oneshot;

    use super::*;
    use crate::services::bounded::TimedOut;

    fn receipt() -> CheckoutReceipt {
        CheckoutReceipt {
            order_number: OrderNumber::parse("ORD-20260314-0042").unwrap(),
            client_secret: "pi_secret".to_string(),
            publishable_key: "pk_test".to_string(),
            totals: OrderTotals {
                subtotal: Decimal::ONE,
                discount: Decimal::ZERO,
                tax: Decimal::ZERO,
                delivery_fee: Decimal::ZERO,
                total: Decimal::ONE,
            },
            delivery: None,
            coupon: None,
            warnings: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_success_moves_to_ready() {
        let controller = CheckoutController::new();
        let mut phases = controller.subscribe();

        controller.submit(async { Ok(receipt()) }).await.unwrap();

        assert!(phases.has_changed().unwrap());
        assert!(matches!(
            *phases.borrow_and_update(),
            CheckoutPhase::Ready { .. }
        ));
        assert!(!controller.is_processing());
    }

    #[tokio::test]
    async fn test_failures_settle_by_class() {
        let controller = CheckoutController::new();

        let _ = controller
            .submit(async {
                Err(CheckoutError::OrderTimedOut(TimedOut {
                    operation: "order_insert",
                    budget: Duration::from_secs(15),
                }))
            })
            .await;
        assert!(matches!(controller.phase(), CheckoutPhase::TimedOut { .. }));
        assert!(!controller.is_processing());

        let _ = controller
            .submit(async { Err(CheckoutError::EmptyCart) })
            .await;
        assert_eq!(
            controller.phase(),
            CheckoutPhase::Error {
                message: "Your cart is empty.".to_string(),
                order_number: None,
            }
        );
        assert!(!controller.is_processing());
    }

    #[tokio::test]
    async fn test_concurrent_submit_is_rejected() {
        let controller = Arc::new(CheckoutController::new());
        let (release, wait) = oneshot::channel::<()>();

        let first = tokio::spawn({
            let controller = controller.clone();
            async move {
                controller
                    .submit(async move {
                        wait.await.unwrap();
                        Ok(receipt())
                    })
                    .await
            }
        });

        while !controller.is_processing() {
            tokio::task::yield_now().await;
        }
        assert_eq!(controller.phase(), CheckoutPhase::Validating);

        let second = controller.submit(async { Ok(receipt()) }).await;
        assert!(matches!(second, Err(CheckoutError::AlreadyInProgress)));

        release.send(()).unwrap();
        assert!(first.await.unwrap().is_ok());
        assert!(!controller.is_processing());
    }

    #[tokio::test]
    async fn test_cancellation_clears_processing_flag() {
        let controller = CheckoutController::new();

        let attempt = controller.submit(std::future::pending());
        let timed_out = tokio::time::timeout(Duration::from_millis(10), attempt).await;

        assert!(timed_out.is_err());
        assert!(!controller.is_processing());
        assert_eq!(controller.phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_registry_reuses_controller_per_session() {
        let registry = CheckoutControllers::new();
        let a = registry.for_session("session-a").await;
        let again = registry.for_session("session-a").await;
        let b = registry.for_session("session-b").await;

        assert!(Arc::ptr_eq(&a, &again));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.phase("never-seen").await, CheckoutPhase::Idle);
    }
}
