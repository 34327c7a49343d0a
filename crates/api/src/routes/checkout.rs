//! Checkout route handler.

use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use cartage_core::{CartId, OrderId, ShippingAddress};

use super::parse_json;
use crate::db::Store;
use crate::error::Result;
use crate::services::CheckoutService;
use crate::state::AppState;

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub cart_id: CartId,
    pub address: ShippingAddress,
}

/// Checkout response body.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
}

/// Convert a cart into an order.
pub async fn checkout<S: Store>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    let request: CheckoutRequest = parse_json(&body)?;

    let order_id = CheckoutService::new(state.store(), state.settings(), state.references())
        .checkout(request.cart_id, request.address)
        .await?;

    Ok((StatusCode::CREATED, Json(CheckoutResponse { order_id })))
}
