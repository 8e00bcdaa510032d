//! Checkout orchestration.
//!
//! One customer submit runs these steps in strict order:
//!
//! 0. Generate the order number (before any network call).
//! 1. Price the cart. A coupon code is re-validated against subtotal, tax
//!    and fee; failure removes the discount and adds a warning.
//! 2. Look up the signed-in account; any failure means guest checkout.
//! 3. Delivery only: validate the address. Out-of-zone aborts; unverifiable
//!    or timed out continues with a warning.
//! 4. Insert the order (`pending`). Nothing is rolled back after this.
//! 5. Notify staff on a detached task.
//! 6. Request a payment intent for the recorded total.
//! 7. Return the client secret.
//!
//! Each network step runs under its own budget from [`StepBudgets`].

mod controller;
mod error;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{Span, debug, info, instrument, warn};

use saffron_core::{
    Cart, CustomerForm, LineItem, NewOrder, Order, OrderNumber, OrderTotals, OrderType,
    PricingPolicy, UserId,
};

pub use controller::{CheckoutController, CheckoutControllers, CheckoutPhase};
pub use error::{CheckoutError, CompletionError, TIMEOUT_MESSAGE};

pub use crate::services::delivery::DELIVERY_TIMEOUT_WARNING;

use crate::db::OrderRepository;
use crate::models::{CurrentUser, keys};
use crate::services::bounded::{BoundedError, bounded, bounded_try};
use crate::services::coupons::{Coupon, CouponDecision, CouponValidator};
use crate::services::delivery::{AddressInput, DeliveryOutcome, DeliveryValidator};
use crate::services::notifications::{StaffNotifier, notify_in_background};
use crate::services::payments::{PaymentIntentIssuer, PaymentIntentRequest};

/// Warning when the coupon service cannot be reached.
pub const COUPON_UNAVAILABLE_WARNING: &str =
    "We couldn't check your coupon right now, so no discount was applied.";

/// Deadline for each network step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBudgets {
    pub session: Duration,
    pub coupon: Duration,
    pub order_insert: Duration,
    pub payment_intent: Duration,
    /// Delivery validation with a resolved place id.
    pub delivery_resolved: Duration,
    /// Delivery validation that must geocode raw text first.
    pub delivery_text: Duration,
}

impl Default for StepBudgets {
    fn default() -> Self {
        Self {
            session: Duration::from_secs(2),
            coupon: Duration::from_secs(5),
            order_insert: Duration::from_secs(15),
            payment_intent: Duration::from_secs(15),
            delivery_resolved: Duration::from_secs(20),
            delivery_text: Duration::from_secs(35),
        }
    }
}

impl StepBudgets {
    #[must_use]
    pub const fn delivery_for(&self, input: &AddressInput) -> Duration {
        if input.is_text_only() {
            self.delivery_text
        } else {
            self.delivery_resolved
        }
    }
}

/// Session lookup failed.
#[derive(Debug, thiserror::Error)]
#[error("session lookup failed: {0}")]
pub struct SessionLookupError(pub String);

/// Source of the signed-in account for a checkout.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn current_user(&self) -> Result<Option<UserId>, SessionLookupError>;
}

#[async_trait]
impl SessionSource for tower_sessions::Session {
    async fn current_user(&self) -> Result<Option<UserId>, SessionLookupError> {
        self.get::<CurrentUser>(keys::CURRENT_USER)
            .await
            .map(|user| user.map(|u| u.id))
            .map_err(|e| SessionLookupError(e.to_string()))
    }
}

/// A session with nobody signed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestSession;

#[async_trait]
impl SessionSource for GuestSession {
    async fn current_user(&self) -> Result<Option<UserId>, SessionLookupError> {
        Ok(None)
    }
}

/// Everything a customer submits.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub cart: Cart,
    pub order_type: OrderType,
    pub customer: CustomerForm,
    /// Place id from address autocomplete, if the customer picked one.
    pub place_id: Option<String>,
    pub coupon_code: Option<String>,
}

/// Successful checkout, ready for payment confirmation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub order_number: OrderNumber,
    pub client_secret: String,
    pub publishable_key: String,
    pub totals: OrderTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<Coupon>,
    /// Soft failures the customer should know about.
    pub warnings: Vec<String>,
}

/// Composes validation, persistence and payment into one checkout.
#[derive(Clone)]
pub struct CheckoutService {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentIntentIssuer>,
    coupons: Arc<dyn CouponValidator>,
    delivery: DeliveryValidator,
    notifier: Option<Arc<dyn StaffNotifier>>,
    pricing: PricingPolicy,
    budgets: StepBudgets,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentIntentIssuer>,
        coupons: Arc<dyn CouponValidator>,
        delivery: DeliveryValidator,
        pricing: PricingPolicy,
    ) -> Self {
        Self {
            orders,
            payments,
            coupons,
            delivery,
            notifier: None,
            pricing,
            budgets: StepBudgets::default(),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn StaffNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub const fn with_budgets(mut self, budgets: StepBudgets) -> Self {
        self.budgets = budgets;
        self
    }

    #[must_use]
    pub const fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    #[must_use]
    pub const fn budgets(&self) -> &StepBudgets {
        &self.budgets
    }

    #[must_use]
    pub const fn delivery(&self) -> &DeliveryValidator {
        &self.delivery
    }

    /// Validate a coupon for a cart without placing an order.
    ///
    /// # Errors
    ///
    /// Returns `BoundedError` if the coupon service fails or times out.
    pub async fn check_coupon(
        &self,
        code: &str,
        subtotal: Decimal,
        order_type: OrderType,
    ) -> Result<CouponDecision, BoundedError<crate::services::coupons::CouponError>> {
        let basis = self.pricing.coupon_basis(subtotal, order_type);
        bounded_try("coupon", self.budgets.coupon, self.coupons.validate(code, basis)).await
    }

    /// Classify an address under the delivery budget without placing an
    /// order. Expiry is reported as unverifiable.
    pub async fn check_delivery(&self, input: &AddressInput) -> DeliveryOutcome {
        bounded(
            "delivery",
            self.budgets.delivery_for(input),
            self.delivery.validate(input),
        )
        .await
        .unwrap_or_else(|_| DeliveryOutcome::timed_out())
    }

    /// Run a checkout.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` for input errors, an out-of-zone address, and
    /// insert or payment failures. See [`CheckoutError::order_number`] for
    /// whether an order row was left behind.
    #[instrument(
        skip(self, request, session),
        fields(order_type = %request.order_type, order_number = tracing::field::Empty)
    )]
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
        session: &dyn SessionSource,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let CheckoutRequest {
            cart,
            order_type,
            customer,
            place_id,
            coupon_code,
        } = request;

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let customer = customer
            .validate(order_type)
            .map_err(CheckoutError::InvalidInput)?;

        // Step 0
        let order_number = OrderNumber::generate(Utc::now().date_naive(), &mut rand::rng());
        Span::current().record("order_number", order_number.as_str());

        let mut warnings = Vec::new();

        // Step 1
        let subtotal = cart.subtotal();
        let coupon = match coupon_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                self.apply_coupon(code, subtotal, order_type, &mut warnings)
                    .await
            }
            _ => None,
        };
        let discount = coupon.as_ref().map_or(Decimal::ZERO, |c| c.discount);
        let totals = self.pricing.totals(subtotal, order_type, discount);

        // Step 2
        let user_id = match bounded("session", self.budgets.session, session.current_user()).await
        {
            Ok(Ok(user_id)) => user_id,
            Ok(Err(e)) => {
                warn!(error = %e, "Continuing as guest");
                None
            }
            Err(_) => None,
        };

        // Step 3
        let delivery = if order_type.is_delivery() {
            let address = customer.delivery_address.as_deref().unwrap_or_default();
            let input = AddressInput::new(place_id.as_deref(), address);
            let outcome = self.check_delivery(&input).await;

            if !outcome.allows_checkout() {
                return Err(CheckoutError::OutOfZone(outcome));
            }
            if let DeliveryOutcome::Unverifiable { warning } = &outcome {
                warnings.push(warning.clone());
            }
            Some(outcome)
        } else {
            None
        };

        // Step 4
        let new_order = NewOrder {
            order_number: order_number.clone(),
            customer,
            order_type,
            items: cart.items().iter().map(LineItem::from).collect(),
            totals,
            coupon_code: coupon.as_ref().map(|c| c.code.clone()),
            delivery_minutes: delivery.as_ref().and_then(DeliveryOutcome::estimated_minutes),
            user_id,
        };
        let order = bounded_try(
            "order_insert",
            self.budgets.order_insert,
            self.orders.insert(&new_order),
        )
        .await
        .map_err(|e| match e {
            BoundedError::TimedOut(t) => CheckoutError::OrderTimedOut(t),
            BoundedError::Failed(e) => CheckoutError::OrderFailed(e),
        })?;
        info!(total = %order.totals.total, "Order created");

        // Step 5
        if let Some(notifier) = &self.notifier {
            notify_in_background(notifier.clone(), order.clone());
        }

        // Step 6
        let intent_request =
            PaymentIntentRequest::for_order(&order).map_err(|source| {
                CheckoutError::PaymentFailed {
                    order_number: order_number.clone(),
                    source,
                }
            })?;
        let intent = bounded_try(
            "payment_intent",
            self.budgets.payment_intent,
            self.payments.create_intent(&intent_request),
        )
        .await
        .map_err(|e| match e {
            BoundedError::TimedOut(timeout) => CheckoutError::PaymentTimedOut {
                order_number: order_number.clone(),
                timeout,
            },
            BoundedError::Failed(source) => {
                warn!(error = %source, "Payment intent failed after order insert");
                CheckoutError::PaymentFailed {
                    order_number: order_number.clone(),
                    source,
                }
            }
        })?;

        // Step 7
        debug!(warnings = warnings.len(), "Checkout ready for payment");
        Ok(CheckoutReceipt {
            order_number: order.order_number,
            client_secret: intent.client_secret,
            publishable_key: intent.publishable_key,
            totals: order.totals,
            delivery,
            coupon,
            warnings,
        })
    }

    /// Confirm the pending order's payment and mark it paid.
    ///
    /// Marking an already-paid order again returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::NotPaid` unless the payment service reports
    /// success, `CompletionError::TimedOut` when either step runs past its
    /// budget, and repository errors for missing or non-pending orders.
    #[instrument(skip(self), fields(order_number = %order_number))]
    pub async fn complete(&self, order_number: &OrderNumber) -> Result<Order, CompletionError> {
        let status = bounded_try(
            "payment_status",
            self.budgets.payment_intent,
            self.payments.payment_status(order_number),
        )
        .await
        .map_err(|e| match e {
            BoundedError::TimedOut(t) => CompletionError::TimedOut(t),
            BoundedError::Failed(e) => CompletionError::Payment(e),
        })?;

        if !status.is_succeeded() {
            return Err(CompletionError::NotPaid {
                order_number: order_number.clone(),
                status,
            });
        }

        let order = bounded_try(
            "mark_paid",
            self.budgets.order_insert,
            self.orders.mark_paid(order_number),
        )
        .await
        .map_err(|e| match e {
            BoundedError::TimedOut(t) => CompletionError::TimedOut(t),
            BoundedError::Failed(e) => CompletionError::Repository(e),
        })?;
        info!("Order paid");
        Ok(order)
    }

    async fn apply_coupon(
        &self,
        code: &str,
        subtotal: Decimal,
        order_type: OrderType,
        warnings: &mut Vec<String>,
    ) -> Option<Coupon> {
        match self.check_coupon(code, subtotal, order_type).await {
            Ok(CouponDecision::Accepted(coupon)) => Some(coupon),
            Ok(CouponDecision::Rejected { reason }) => {
                warnings.push(format!("Coupon {code} was not applied: {reason}"));
                None
            }
            Err(e) => {
                warn!(error = %e, "Coupon check failed, continuing without discount");
                warnings.push(COUPON_UNAVAILABLE_WARNING.to_string());
                None
            }
        }
    }
}
