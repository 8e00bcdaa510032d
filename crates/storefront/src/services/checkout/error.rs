//! Checkout failure taxonomy.
//!
//! Every step failure is converted into exactly one of these at the
//! orchestrator boundary. Soft failures (session, coupon, unverifiable
//! address, notification) never appear here; they become receipt warnings.

use thiserror::Error;

use saffron_core::{FieldError, OrderNumber};

use crate::db::{OrderInsertError, RepositoryError};
use crate::services::bounded::TimedOut;
use crate::services::delivery::DeliveryOutcome;
use crate::services::payments::{PaymentError, PaymentStatus};

/// Shown for every timeout-class failure.
pub const TIMEOUT_MESSAGE: &str =
    "This is taking longer than expected. Please check your connection and try again.";

/// Errors returned by checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    /// One entry per failing form field.
    #[error("invalid customer details ({} fields)", .0.len())]
    InvalidInput(Vec<FieldError>),

    /// Address is outside the delivery area; no order was created.
    #[error("address outside delivery area")]
    OutOfZone(DeliveryOutcome),

    /// Order insert failed; no order was created.
    #[error("order insert failed: {0}")]
    OrderFailed(#[from] OrderInsertError),

    /// Order insert ran past its budget.
    #[error("order insert timed out: {0}")]
    OrderTimedOut(TimedOut),

    /// Order exists but no payment intent could be created.
    #[error("payment intent failed for {order_number}: {source}")]
    PaymentFailed {
        order_number: OrderNumber,
        source: PaymentError,
    },

    /// Order exists but the payment intent request ran past its budget.
    #[error("payment intent timed out for {order_number}: {timeout}")]
    PaymentTimedOut {
        order_number: OrderNumber,
        timeout: TimedOut,
    },

    /// Another submit for this session has not settled yet.
    #[error("checkout already in progress")]
    AlreadyInProgress,
}

impl CheckoutError {
    /// Message shown to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart => "Your cart is empty.".to_string(),
            Self::InvalidInput(_) => "Please correct the highlighted fields.".to_string(),
            Self::OutOfZone(outcome) => outcome.message().unwrap_or_else(|| {
                "This address is outside our delivery area. Try pickup instead?".to_string()
            }),
            Self::OrderFailed(e) => e.user_message(),
            Self::OrderTimedOut(_) => TIMEOUT_MESSAGE.to_string(),
            Self::PaymentFailed { order_number, .. } => format!(
                "Your order {order_number} was saved, but we couldn't start payment. Please try again or contact us with your order number."
            ),
            Self::PaymentTimedOut { order_number, .. } => {
                format!("{TIMEOUT_MESSAGE} Your order number is {order_number}.")
            }
            Self::AlreadyInProgress => "Checkout already in progress.".to_string(),
        }
    }

    /// Whether this failure is a deadline expiry.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::OrderTimedOut(_) | Self::PaymentTimedOut { .. })
    }

    /// Whether the customer should be offered pickup instead.
    #[must_use]
    pub const fn suggests_pickup(&self) -> bool {
        matches!(
            self,
            Self::OutOfZone(DeliveryOutcome::OutOfZone {
                suggest_pickup: true,
                ..
            })
        )
    }

    /// The order number when an order row was already written.
    #[must_use]
    pub const fn order_number(&self) -> Option<&OrderNumber> {
        match self {
            Self::PaymentFailed { order_number, .. }
            | Self::PaymentTimedOut { order_number, .. } => Some(order_number),
            _ => None,
        }
    }

    /// Per-field errors for inline display.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::InvalidInput(errors) => errors,
            _ => &[],
        }
    }
}

/// Errors confirming a paid order.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The payment service has not seen a successful charge.
    #[error("payment for {order_number} is {status:?}")]
    NotPaid {
        order_number: OrderNumber,
        status: PaymentStatus,
    },

    /// Status lookup failed.
    #[error("payment status lookup failed: {0}")]
    Payment(#[from] PaymentError),

    /// Status lookup or the paid update ran past its budget.
    #[error("completion timed out: {0}")]
    TimedOut(TimedOut),

    /// Order could not be marked paid.
    #[error("order update failed: {0}")]
    Repository(#[from] RepositoryError),
}

impl CompletionError {
    /// Message shown to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotPaid { order_number, .. } => {
                format!("We haven't received payment for order {order_number} yet.")
            }
            Self::Payment(_) => {
                "We couldn't confirm your payment. Please contact us with your order number."
                    .to_string()
            }
            Self::TimedOut(_) => TIMEOUT_MESSAGE.to_string(),
            Self::Repository(RepositoryError::NotFound) => "Order not found.".to_string(),
            Self::Repository(RepositoryError::Conflict(_)) => {
                "This order can no longer be paid.".to_string()
            }
            Self::Repository(_) => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::services::delivery::OutOfZoneReason;

    fn number() -> OrderNumber {
        OrderNumber::parse("ORD-20260314-0042").unwrap()
    }

    #[test]
    fn test_timeout_classes() {
        let timeout = TimedOut {
            operation: "payment_intent",
            budget: Duration::from_secs(15),
        };
        let err = CheckoutError::PaymentTimedOut {
            order_number: number(),
            timeout,
        };
        assert!(err.is_timeout());
        assert!(err.user_message().starts_with(TIMEOUT_MESSAGE));
        assert!(err.user_message().contains("ORD-20260314-0042"));
        assert_eq!(err.order_number(), Some(&number()));

        assert!(CheckoutError::OrderTimedOut(timeout).is_timeout());
        assert!(!CheckoutError::EmptyCart.is_timeout());
    }

    #[test]
    fn test_out_of_zone_suggests_pickup() {
        let err = CheckoutError::OutOfZone(DeliveryOutcome::OutOfZone {
            reason: OutOfZoneReason::TooFar,
            estimated_minutes: Some(27),
            suggest_pickup: true,
        });
        assert!(err.suggests_pickup());
        assert!(err.user_message().contains("pickup"));
        assert_eq!(err.order_number(), None);
    }

    #[test]
    fn test_completion_messages() {
        let err = CompletionError::NotPaid {
            order_number: number(),
            status: PaymentStatus::Processing,
        };
        assert!(err.user_message().contains("ORD-20260314-0042"));
        assert_eq!(
            CompletionError::from(RepositoryError::NotFound).user_message(),
            "Order not found."
        );
    }

    #[test]
    fn test_insert_failure_message_passes_through() {
        let err = CheckoutError::from(OrderInsertError::Collision(number()));
        assert_eq!(err.user_message(), "Order number collision, please retry.");
        assert!(!err.suggests_pickup());
    }
}
