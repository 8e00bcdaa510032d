//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `checkout_rate_limiter`: strict limits for checkout endpoints (~10/min)
//! - `api_rate_limiter`: relaxed limits for cart and lookup endpoints (~100/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Proxy headers checked in order for the real client IP.
const CLIENT_IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// Keys requests by client IP: proxy headers first, then the socket peer.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

fn header_ip<T>(req: &Request<T>, name: &str) -> Option<IpAddr> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        // X-Forwarded-For lists the client first
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        CLIENT_IP_HEADERS
            .iter()
            .find_map(|name| header_ip(req, name))
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Governor rejected the limiter parameters.
#[derive(Debug, thiserror::Error)]
#[error("invalid rate limiter configuration: one token every {period_secs}s, burst {burst}")]
pub struct RateLimitConfigError {
    period_secs: u64,
    burst: u32,
}

fn limiter(period_secs: u64, burst: u32) -> Result<RateLimiterLayer, RateLimitConfigError> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(period_secs)
        .burst_size(burst)
        .finish()
        .ok_or(RateLimitConfigError { period_secs, burst })?;
    Ok(GovernorLayer::new(Arc::new(config)))
}

/// Checkout endpoints: one token every 6 seconds with a burst of 5.
///
/// # Errors
///
/// Returns an error if governor rejects the configuration.
pub fn checkout_rate_limiter() -> Result<RateLimiterLayer, RateLimitConfigError> {
    limiter(6, 5)
}

/// Cart, menu and lookup endpoints: one token per second with a burst of 50.
///
/// # Errors
///
/// Returns an error if governor rejects the configuration.
pub fn api_rate_limiter() -> Result<RateLimiterLayer, RateLimitConfigError> {
    limiter(1, 50)
}
