//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (store ping)
//!
//! # Checkout and orders
//! POST   /v1/checkout                     - Convert a cart into an order
//! GET    /v1/orders/{id}                  - Order with items and address
//!
//! # Payments
//! POST   /v1/payments/initiate            - Start a payment for an order
//! POST   /v1/payments/webhook/{provider}  - Provider notification
//!
//! # Cart
//! POST   /v1/cart                         - Create an empty cart
//! GET    /v1/cart/{id}                    - Cart with items
//! POST   /v1/cart/{id}/items              - Add or replace a line
//! PATCH  /v1/cart/{id}/items/{item_id}    - Change a line's quantity
//! DELETE /v1/cart/{id}/items/{item_id}    - Remove a line
//! ```
//!
//! Handlers take the raw body and decode it themselves so malformed JSON
//! (`invalid_json`) can be told apart from a well-formed body of the wrong
//! shape (`invalid_payload`).

pub mod carts;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod payments;

use std::str::FromStr;

use axum::{
    Router,
    body::Bytes,
    routing::{get, patch, post},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::db::Store;
use crate::error::AppError;
use crate::state::AppState;

/// Create the health check router.
pub fn health_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S>))
}

/// Create the `/v1` router.
pub fn v1_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/checkout", post(checkout::checkout::<S>))
        .route("/orders/{id}", get(orders::show::<S>))
        .route("/payments/initiate", post(payments::initiate::<S>))
        .route("/payments/webhook/{provider}", post(payments::webhook::<S>))
        .route("/cart", post(carts::create::<S>))
        .route("/cart/{id}", get(carts::show::<S>))
        .route("/cart/{id}/items", post(carts::upsert_item::<S>))
        .route(
            "/cart/{id}/items/{item_id}",
            patch(carts::update_item::<S>).delete(carts::delete_item::<S>),
        )
}

/// Create all application routes.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .merge(health_routes())
        .nest("/v1", v1_routes())
}

/// Decode a JSON request body.
///
/// Syntax errors and truncated input are `invalid_json`; valid JSON that does
/// not match `T` is `invalid_payload`.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| match e.classify() {
        Category::Data => AppError::InvalidPayload(e.to_string()),
        Category::Syntax | Category::Eof | Category::Io => AppError::InvalidJson,
    })
}

/// Parse a path segment; anything unparseable names no resource.
pub(crate) fn parse_path<T: FromStr>(segment: &str) -> Result<T, AppError> {
    segment.parse().map_err(|_| AppError::NotFound)
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[allow(dead_code)]
        qty: i32,
    }

    #[test]
    fn test_parse_json_distinguishes_syntax_from_shape() {
        let syntax = parse_json::<Probe>(&Bytes::from_static(b"{\"qty\": ")).unwrap_err();
        assert!(matches!(syntax, AppError::InvalidJson));

        let empty = parse_json::<Probe>(&Bytes::new()).unwrap_err();
        assert!(matches!(empty, AppError::InvalidJson));

        let shape = parse_json::<Probe>(&Bytes::from_static(b"{\"qty\": \"two\"}")).unwrap_err();
        assert!(matches!(shape, AppError::InvalidPayload(_)));

        let missing = parse_json::<Probe>(&Bytes::from_static(b"{}")).unwrap_err();
        assert!(matches!(missing, AppError::InvalidPayload(_)));
    }

    #[test]
    fn test_parse_path_rejects_non_uuid() {
        let err = parse_path::<cartage_core::OrderId>("not-a-uuid").unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }
}
