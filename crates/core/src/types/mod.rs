//! Core types for Saffron Kitchen.
//!
//! This module provides type-safe wrappers for the ordering domain.

pub mod cart;
pub mod customer;
pub mod email;
pub mod id;
pub mod money;
pub mod order;
pub mod order_number;
pub mod phone;
pub mod pricing;
pub mod status;

pub use cart::{Cart, CartError, CartItem};
pub use customer::{CustomerForm, CustomerInfo, FieldError};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{format_usd, round_cents, to_minor_units};
pub use order::{LineItem, NewOrder, Order};
pub use order_number::{OrderNumber, OrderNumberError};
pub use phone::{PhoneError, PhoneNumber};
pub use pricing::{OrderTotals, PricingPolicy};
pub use status::*;
