//! Order lookup.

use axum::{
    Json,
    extract::{Path, State},
};

use cartage_core::{Order, OrderId};

use super::parse_path;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Return an order with its frozen items and address snapshot.
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id: OrderId = parse_path(&id)?;
    let order = state.store().get_order(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(order))
}
