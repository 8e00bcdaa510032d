//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `bounded` - Deadlines for every network step
//! - `checkout` - Order placement pipeline and per-session state machine
//! - `coupons` - Remote coupon validation
//! - `delivery` - Delivery zone classification
//! - `notifications` - Slack posts for new orders
//! - `payments` - Payment intent creation and status

pub mod bounded;
pub mod checkout;
pub mod coupons;
pub mod delivery;
pub mod notifications;
pub mod payments;
