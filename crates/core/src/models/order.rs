//! Order domain types and checkout pricing.
//!
//! An order is a frozen copy of a cart at checkout time. Prices, SKUs and
//! names are copied from the catalog snapshot into the order items and are
//! never re-derived afterwards.

use core::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    CurrencyCode, Money, OrderId, OrderItemId, OrderStatus, ShippingAddress, VariantId,
};

/// A cart line joined with the catalog snapshot of its active variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub variant_id: VariantId,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub qty: i32,
}

/// Errors that can occur when pricing an order draft.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    /// No purchasable lines remained after filtering.
    #[error("cart has no purchasable items")]
    Empty,
    /// A line or order total does not fit in the money type.
    #[error("order total overflows")]
    Overflow,
}

/// A priced order line ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftItem {
    pub variant_id: VariantId,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub qty: i32,
    pub line_total: Money,
}

/// Everything needed to write an order except its identifiers.
///
/// Invariants upheld by [`OrderDraft::price`]:
/// - `subtotal` is the sum of `line_total` over `items`
/// - `grand_total = subtotal - discount_total + shipping_total`
/// - `items` is non-empty and every `qty` is positive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub currency: CurrencyCode,
    pub subtotal: Money,
    pub discount_total: Money,
    pub shipping_total: Money,
    pub grand_total: Money,
    pub items: Vec<DraftItem>,
    pub shipping_address: ShippingAddress,
}

impl OrderDraft {
    /// Price a set of catalog-joined cart lines.
    ///
    /// Lines with a non-positive quantity are dropped. Discounts and shipping
    /// are zero; they are kept as separate fields so pricing rules can be
    /// added without changing the stored shape.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::Empty`] if no line survives filtering and
    /// [`DraftError::Overflow`] if any total overflows.
    pub fn price(
        currency: CurrencyCode,
        lines: Vec<PricedLine>,
        shipping_address: ShippingAddress,
    ) -> Result<Self, DraftError> {
        let mut items = Vec::with_capacity(lines.len());
        let mut subtotal = Money::ZERO;

        for line in lines.into_iter().filter(|line| line.qty > 0) {
            let line_total = line
                .unit_price
                .checked_mul_qty(line.qty)
                .ok_or(DraftError::Overflow)?;
            subtotal = subtotal
                .checked_add(line_total)
                .ok_or(DraftError::Overflow)?;
            items.push(DraftItem {
                variant_id: line.variant_id,
                sku: line.sku,
                name: line.name,
                unit_price: line.unit_price,
                qty: line.qty,
                line_total,
            });
        }

        if items.is_empty() {
            return Err(DraftError::Empty);
        }

        let discount_total = Money::ZERO;
        let shipping_total = Money::ZERO;
        let grand_total = subtotal
            .checked_sub(discount_total)
            .and_then(|m| m.checked_add(shipping_total))
            .ok_or(DraftError::Overflow)?;

        Ok(Self {
            currency,
            subtotal,
            discount_total,
            shipping_total,
            grand_total,
            items,
            shipping_address,
        })
    }
}

/// Human-readable order reference, e.g. `ORD-20261019-8F3A2C`.
///
/// Generation is random and can collide; the store's unique constraint on
/// `order_number` is the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Build an order number from a date stamp and a random suffix.
    #[must_use]
    pub fn compose(date: NaiveDate, suffix: [u8; 3]) -> Self {
        let mut number = format!("ORD-{}-", date.format("%Y%m%d"));
        for byte in suffix {
            let _ = write!(number, "{byte:02X}");
        }
        Self(number)
    }

    /// Wrap a value read back from storage.
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A placed order with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub currency: CurrencyCode,
    pub subtotal: Money,
    pub discount_total: Money,
    pub shipping_total: Money,
    pub grand_total: Money,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

/// A frozen order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub variant_id: VariantId,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub qty: i32,
    pub line_total: Money,
}

/// The fields of an order that payment initiation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub status: OrderStatus,
    pub currency: CurrencyCode,
    pub grand_total: Money,
}
