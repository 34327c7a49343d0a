//! Payment initiation.

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use cartage_core::{
    Money, NewPayment, OrderId, OrderStatus, PaymentId, PaymentStatus, ProviderName,
};

use super::ReferenceGenerator;
use crate::config::CheckoutSettings;
use crate::db::{RepositoryError, Store, UnitOfWork};

/// Errors that can occur when initiating a payment.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// No order with this id exists.
    #[error("order not found")]
    NotFound,

    /// The order exists but is no longer awaiting payment.
    #[error("order is {0}, not pending_payment")]
    OrderNotPayable(OrderStatus),

    /// Every generated provider reference collided.
    #[error("no unique provider reference after {0} attempts")]
    ReferencesExhausted(u32),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A freshly created payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitiatedPayment {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub status: PaymentStatus,
    pub amount: Money,
    pub provider: ProviderName,
    pub provider_ref: String,
}

/// Payment initiation service.
pub struct PaymentService<'a, S> {
    store: &'a S,
    settings: &'a CheckoutSettings,
    references: &'a dyn ReferenceGenerator,
}

impl<'a, S: Store> PaymentService<'a, S> {
    /// Create a new payment service.
    #[must_use]
    pub const fn new(
        store: &'a S,
        settings: &'a CheckoutSettings,
        references: &'a dyn ReferenceGenerator,
    ) -> Self {
        Self {
            store,
            settings,
            references,
        }
    }

    /// Create an `initiated` payment for the full grand total of an order.
    ///
    /// The order row is share-locked while the payment is written, so it
    /// cannot leave `pending_payment` in between. An order may carry several
    /// payments; each is reconciled on its own provider reference.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotFound` if the order is missing,
    /// `OrderNotPayable` if it is not `pending_payment`, and `Repository` or
    /// `ReferencesExhausted` for internal failures.
    #[instrument(skip(self, provider), fields(order_id = %order_id))]
    pub async fn initiate(
        &self,
        order_id: OrderId,
        provider: Option<ProviderName>,
    ) -> Result<InitiatedPayment, PaymentError> {
        let provider = provider.unwrap_or_else(|| self.settings.default_provider.clone());

        let mut tx = self.store.begin().await?;

        let order = tx.lock_order(order_id).await?.ok_or(PaymentError::NotFound)?;
        if order.status != OrderStatus::PendingPayment {
            return Err(PaymentError::OrderNotPayable(order.status));
        }

        let attempts = self.settings.id_retry_attempts;
        for attempt in 1..=attempts {
            let payment = NewPayment {
                order_id,
                provider: provider.clone(),
                provider_ref: self.references.provider_ref(),
                amount: order.grand_total,
            };

            let Some(payment_id) = tx.insert_payment(&payment).await? else {
                tracing::debug!(attempt, provider = %provider, "Provider reference collision");
                continue;
            };
            tx.commit().await?;

            tracing::info!(
                payment_id = %payment_id,
                provider = %payment.provider,
                amount = %payment.amount,
                currency = %order.currency,
                "Payment initiated"
            );
            return Ok(InitiatedPayment {
                payment_id,
                order_id,
                status: PaymentStatus::Initiated,
                amount: payment.amount,
                provider: payment.provider,
                provider_ref: payment.provider_ref,
            });
        }

        Err(PaymentError::ReferencesExhausted(attempts))
    }
}
