//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server errors are captured to
//! Sentry before responding; clients only ever see a fixed error code and a
//! short message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{CheckoutError, PaymentError, WebhookError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body is not valid JSON.
    #[error("request body is not valid JSON")]
    InvalidJson,

    /// Request body is JSON but does not match the expected shape.
    #[error("{0}")]
    InvalidPayload(String),

    /// Webhook reported a status outside the accepted set.
    #[error("{0}")]
    InvalidStatus(String),

    /// Resource missing, or not in a state that allows the operation.
    #[error("not found")]
    NotFound,

    /// Cart has no purchasable lines.
    #[error("cart has no purchasable items")]
    EmptyCart,

    /// Request did not finish before the deadline.
    #[error("request timed out")]
    Timeout,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl AppError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson => "invalid_json",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::InvalidStatus(_) => "invalid_status",
            Self::NotFound => "not_found",
            Self::EmptyCart => "empty_cart",
            Self::Timeout => "timeout",
            Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson | Self::InvalidPayload(_) | Self::InvalidStatus(_) | Self::EmptyCart => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => Some("Internal server error".to_owned()),
            Self::NotFound => None,
            _ => Some(self.to_string()),
        };

        let body = ErrorBody {
            error: self.code(),
            message: message.as_deref(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvalidAddress(e) => Self::InvalidPayload(e.to_string()),
            CheckoutError::NotFound | CheckoutError::CartConverted => Self::NotFound,
            CheckoutError::EmptyCart => Self::EmptyCart,
            CheckoutError::Repository(e) => e.into(),
            e @ (CheckoutError::Overflow | CheckoutError::ReferencesExhausted(_)) => {
                Self::Internal(e.to_string())
            }
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotFound | PaymentError::OrderNotPayable(_) => Self::NotFound,
            PaymentError::Repository(e) => e.into(),
            e @ PaymentError::ReferencesExhausted(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidStatus(e) => Self::InvalidStatus(e.to_string()),
            WebhookError::NotFound => Self::NotFound,
            WebhookError::Repository(e) => e.into(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
