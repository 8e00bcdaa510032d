//! Saffron Kitchen Core - Domain types for the ordering storefront.
//!
//! This crate provides the types shared by every Saffron Kitchen component:
//! - `storefront` - JSON API for cart, delivery checks and checkout
//! - `cli` - Migrations and operator tooling
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Pricing and validation rules live here so the
//! storefront and the CLI agree on them.
//!
//! # Modules
//!
//! - [`types`] - IDs, contact details, cart, pricing, orders and order numbers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
