//! Saffron Kitchen storefront library.
//!
//! The ordering API as a library, so the binary, the CLI and the
//! integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod maps;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
