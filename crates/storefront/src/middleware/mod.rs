//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Rate limiting (governor), per route group

pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use rate_limit::{RateLimitConfigError, api_rate_limiter, checkout_rate_limiter};
pub use request_id::request_id_middleware;
pub use session::{SessionKeyError, SessionLayer, create_session_layer};
