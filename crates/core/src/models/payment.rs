//! Payment domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Money, OrderId, PaymentId, PaymentStatus, ProviderName};

/// A payment attempt against an order.
///
/// `(provider, provider_ref)` identifies the payment to the outside world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub provider: ProviderName,
    pub provider_ref: String,
    pub status: PaymentStatus,
    pub amount: Money,
    /// Raw body of the last notification received, verbatim.
    pub payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub provider: ProviderName,
    pub provider_ref: String,
    pub amount: Money,
}

/// The part of a payment row read under lock during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedPayment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub status: PaymentStatus,
}
