//! Status enums for carts, orders and payments.
//!
//! Every status has a stable snake_case name used both on the wire and in the
//! database `status` columns (which carry matching CHECK constraints).

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a status string is not part of the enumerated set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} status: {value}")]
pub struct ParseStatusError {
    /// Which status family was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Lifecycle of a cart.
///
/// A cart moves from `Active` to `Converted` exactly once, during checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    #[default]
    Active,
    Converted,
}

impl CartStatus {
    /// Storage and wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Converted => "converted",
        }
    }
}

impl fmt::Display for CartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CartStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "converted" => Ok(Self::Converted),
            _ => Err(ParseStatusError::new("cart", s)),
        }
    }
}

/// Order payment state.
///
/// The only legal transitions are `PendingPayment -> Paid` and
/// `PendingPayment -> Canceled`; both are applied with a guarded update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    Paid,
    Canceled,
}

impl OrderStatus {
    /// Storage and wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Canceled => "canceled",
        }
    }

    /// Whether `self -> next` is a legal order transition.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingPayment, Self::Paid | Self::Canceled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_payment" => Ok(Self::PendingPayment),
            "paid" => Ok(Self::Paid),
            "canceled" => Ok(Self::Canceled),
            _ => Err(ParseStatusError::new("order", s)),
        }
    }
}

/// Payment record state.
///
/// `Initiated` is only ever written by payment initiation; every other value
/// arrives from a provider notification (see [`WebhookStatus`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Initiated,
    Pending,
    Paid,
    Failed,
    Expired,
    Refunded,
}

impl PaymentStatus {
    /// Storage and wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Refunded => "refunded",
        }
    }

    /// Whether the provider considers this payment settled one way or another.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Paid | Self::Failed | Self::Expired | Self::Refunded
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(Self::Initiated),
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            "refunded" => Ok(Self::Refunded),
            _ => Err(ParseStatusError::new("payment", s)),
        }
    }
}

/// Status values a payment provider may report in a webhook.
///
/// This is the closed set accepted from the outside world; `initiated` is
/// deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    Pending,
    Paid,
    Failed,
    Expired,
    Refunded,
}

impl WebhookStatus {
    /// Storage and wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.payment_status().as_str()
    }

    /// The payment status this notification writes.
    #[must_use]
    pub const fn payment_status(&self) -> PaymentStatus {
        match self {
            Self::Pending => PaymentStatus::Pending,
            Self::Paid => PaymentStatus::Paid,
            Self::Failed => PaymentStatus::Failed,
            Self::Expired => PaymentStatus::Expired,
            Self::Refunded => PaymentStatus::Refunded,
        }
    }

    /// The order status this notification moves a pending order to, if any.
    ///
    /// `pending` and `refunded` never touch the order.
    #[must_use]
    pub const fn order_transition(&self) -> Option<OrderStatus> {
        match self {
            Self::Paid => Some(OrderStatus::Paid),
            Self::Failed | Self::Expired => Some(OrderStatus::Canceled),
            Self::Pending | Self::Refunded => None,
        }
    }
}

impl fmt::Display for WebhookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebhookStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            "refunded" => Ok(Self::Refunded),
            _ => Err(ParseStatusError::new("webhook", s)),
        }
    }
}

impl From<WebhookStatus> for PaymentStatus {
    fn from(status: WebhookStatus) -> Self {
        status.payment_status()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_status_rejects_unknown_values() {
        let err = "weird".parse::<WebhookStatus>().unwrap_err();
        assert_eq!(err.kind, "webhook");
        assert_eq!(err.value, "weird");
        assert!("initiated".parse::<WebhookStatus>().is_err());
        assert!("PAID".parse::<WebhookStatus>().is_err());
    }

    #[test]
    fn test_webhook_order_transitions() {
        assert_eq!(
            WebhookStatus::Paid.order_transition(),
            Some(OrderStatus::Paid)
        );
        assert_eq!(
            WebhookStatus::Failed.order_transition(),
            Some(OrderStatus::Canceled)
        );
        assert_eq!(
            WebhookStatus::Expired.order_transition(),
            Some(OrderStatus::Canceled)
        );
        assert_eq!(WebhookStatus::Pending.order_transition(), None);
        assert_eq!(WebhookStatus::Refunded.order_transition(), None);
    }

    #[test]
    fn test_order_transitions_only_leave_pending_payment() {
        let pending = OrderStatus::PendingPayment;
        assert!(pending.can_transition_to(OrderStatus::Paid));
        assert!(pending.can_transition_to(OrderStatus::Canceled));
        assert!(!pending.can_transition_to(OrderStatus::PendingPayment));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Canceled.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn test_webhook_cascades_are_legal_transitions() {
        for status in [
            WebhookStatus::Pending,
            WebhookStatus::Paid,
            WebhookStatus::Failed,
            WebhookStatus::Expired,
            WebhookStatus::Refunded,
        ] {
            if let Some(next) = status.order_transition() {
                assert!(
                    OrderStatus::PendingPayment.can_transition_to(next),
                    "{status} -> {next}"
                );
            }
        }
    }

    #[test]
    fn test_status_names_match_storage_values() {
        for status in [
            PaymentStatus::Initiated,
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Failed,
            PaymentStatus::Expired,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
        assert_eq!(
            serde_json::to_string(&OrderStatus::PendingPayment).unwrap(),
            "\"pending_payment\""
        );
    }
}
