//! JSON body for requests cut off by the timeout layer.

use axum::{
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// Replace the empty 408 produced by `TimeoutLayer` with the standard error
/// body.
///
/// Responses that already carry a content type are left untouched.
pub async fn timeout_body_middleware(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status() == StatusCode::REQUEST_TIMEOUT
        && !response.headers().contains_key(CONTENT_TYPE)
    {
        tracing::warn!("Request timed out");
        return AppError::Timeout.into_response();
    }
    response
}
