//! Cart domain types.

use serde::{Deserialize, Serialize};

use crate::types::{CartId, CartItemId, CartStatus, VariantId};

/// A shopper's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Unique cart ID.
    pub id: CartId,
    /// Whether the cart can still be checked out.
    pub status: CartStatus,
    /// Line items in insertion order.
    pub items: Vec<CartItem>,
}

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Unique line ID.
    pub id: CartItemId,
    /// Catalog variant the line refers to.
    pub variant_id: VariantId,
    /// Requested quantity; always positive when written through the cart API.
    pub qty: i32,
}

impl Cart {
    /// Whether checkout may consume this cart.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == CartStatus::Active
    }
}
