//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before the JSON error body is sent.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use saffron_core::{CartError, FieldError, OrderNumber};

use crate::db::{OrderInsertError, RepositoryError};
use crate::services::checkout::{CheckoutError, CompletionError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout pipeline failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Cart mutation rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Payment confirmation failed.
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A dependency did not answer in time.
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "no_fields")]
    fields: &'a [FieldError],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    suggest_pickup: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_number: Option<&'a OrderNumber>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn no_fields(fields: &&[FieldError]) -> bool {
    fields.is_empty()
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Checkout(err) => checkout_status(err),
            Self::Completion(err) => completion_status(err),
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Cart(CartError::ItemNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Cart(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Whether the failure is ours rather than the client's.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    // Don't expose internal error details to clients
    fn client_message(&self) -> String {
        match self {
            Self::Checkout(err) => err.user_message(),
            Self::Completion(err) => err.user_message(),
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Upstream(_) => "External service error".to_string(),
            Self::Cart(err) => err.to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(msg) | Self::Conflict(msg) => msg.clone(),
            Self::RateLimited => "Too many requests, please slow down.".to_string(),
        }
    }
}

const fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
        CheckoutError::InvalidInput(_)
        | CheckoutError::OutOfZone(_)
        | CheckoutError::OrderFailed(OrderInsertError::InvalidData(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CheckoutError::OrderFailed(OrderInsertError::Collision(_))
        | CheckoutError::AlreadyInProgress => StatusCode::CONFLICT,
        CheckoutError::OrderFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CheckoutError::OrderTimedOut(_) | CheckoutError::PaymentTimedOut { .. } => {
            StatusCode::GATEWAY_TIMEOUT
        }
        CheckoutError::PaymentFailed { .. } => StatusCode::BAD_GATEWAY,
    }
}

const fn completion_status(err: &CompletionError) -> StatusCode {
    match err {
        CompletionError::NotPaid { .. } => StatusCode::PAYMENT_REQUIRED,
        CompletionError::Payment(_) => StatusCode::BAD_GATEWAY,
        CompletionError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
        CompletionError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        CompletionError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
        CompletionError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (fields, suggest_pickup, order_number) = match &self {
            Self::Checkout(err) => (err.field_errors(), err.suggests_pickup(), err.order_number()),
            _ => (&[][..], false, None),
        };
        let body = ErrorBody {
            error: self.client_message(),
            fields,
            suggest_pickup,
            order_number,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for customer actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
