//! Cart route handlers.
//!
//! A thin collaborator surface so carts can be filled before checkout.
//! Mutating a converted or missing cart is `not_found`.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use cartage_core::{Cart, CartId, CartItemId, VariantId};

use super::{parse_json, parse_path};
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Add-item request body.
#[derive(Debug, Deserialize)]
pub struct UpsertItemRequest {
    pub variant_id: VariantId,
    pub qty: i32,
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub qty: i32,
}

#[derive(Debug, Serialize)]
pub struct CreatedCart {
    pub id: CartId,
}

#[derive(Debug, Serialize)]
pub struct UpsertedItem {
    pub item_id: CartItemId,
}

fn positive_qty(qty: i32) -> Result<i32> {
    if qty <= 0 {
        return Err(AppError::InvalidPayload("qty must be positive".to_owned()));
    }
    Ok(qty)
}

/// Create an empty cart.
pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<(StatusCode, Json<CreatedCart>)> {
    let id = state.store().create_cart().await?;
    tracing::debug!(cart_id = %id, "Cart created");
    Ok((StatusCode::CREATED, Json(CreatedCart { id })))
}

/// Return a cart with its items.
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Cart>> {
    let id: CartId = parse_path(&id)?;
    let cart = state.store().get_cart(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(cart))
}

/// Add a line, or replace the quantity of the line for the same variant.
pub async fn upsert_item<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<UpsertedItem>> {
    let id: CartId = parse_path(&id)?;
    let request: UpsertItemRequest = parse_json(&body)?;
    let qty = positive_qty(request.qty)?;

    let item_id = state
        .store()
        .upsert_cart_item(id, request.variant_id, qty)
        .await?;
    Ok(Json(UpsertedItem { item_id }))
}

/// Change the quantity of an existing line.
pub async fn update_item<S: Store>(
    State(state): State<AppState<S>>,
    Path((id, item_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Value>> {
    let id: CartId = parse_path(&id)?;
    let item_id: CartItemId = parse_path(&item_id)?;
    let request: UpdateItemRequest = parse_json(&body)?;
    let qty = positive_qty(request.qty)?;

    state.store().update_cart_item_qty(id, item_id, qty).await?;
    Ok(Json(json!({ "ok": true })))
}

/// Remove a line.
pub async fn delete_item<S: Store>(
    State(state): State<AppState<S>>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let id: CartId = parse_path(&id)?;
    let item_id: CartItemId = parse_path(&item_id)?;

    state.store().delete_cart_item(id, item_id).await?;
    Ok(Json(json!({ "ok": true })))
}
