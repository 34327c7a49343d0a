//! Webhook reconciliation.
//!
//! Providers deliver notifications at least once, in any order, possibly
//! concurrently. Applying one is idempotent: the payment row is overwritten
//! with the reported status and the order only moves out of
//! `pending_payment` through a guarded update.

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use cartage_core::{
    OrderId, OrderStatus, ParseStatusError, PaymentId, PaymentStatus, ProviderName, WebhookStatus,
};

use crate::db::{RepositoryError, Store, UnitOfWork};

/// Errors that can occur when applying a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The reported status is not one a provider may send.
    #[error("{0}")]
    InvalidStatus(#[from] ParseStatusError),

    /// No payment matches `(provider, provider_ref)`.
    #[error("payment not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of applying a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WebhookOutcome {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub status: PaymentStatus,
    /// Whether this notification moved the order out of `pending_payment`.
    #[serde(skip)]
    pub order_status_changed: bool,
}

/// Webhook reconciliation service.
pub struct WebhookService<'a, S> {
    store: &'a S,
}

impl<'a, S: Store> WebhookService<'a, S> {
    /// Create a new webhook service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Apply a provider notification.
    ///
    /// `status` is checked against the closed set of provider statuses before
    /// any storage access. `payload` is stored verbatim as the payment's last
    /// notification.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidStatus` for an unknown status,
    /// `NotFound` if no payment matches, and `Repository` for storage
    /// failures. A guarded order update that matches nothing is not an error.
    #[instrument(skip(self, payload), fields(provider = %provider))]
    pub async fn apply(
        &self,
        provider: &ProviderName,
        provider_ref: &str,
        status: &str,
        payload: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        let status: WebhookStatus = status.parse()?;
        let new_status = status.payment_status();

        let mut tx = self.store.begin().await?;

        let payment = tx
            .lock_payment(provider, provider_ref)
            .await?
            .ok_or(WebhookError::NotFound)?;

        if payment.status.is_final() && payment.status != new_status {
            tracing::warn!(
                payment_id = %payment.id,
                from = %payment.status,
                to = %new_status,
                "Payment status regression applied"
            );
        }

        tx.update_payment(payment.id, new_status, payload).await?;

        let mut order_status_changed = false;
        if let Some(next) = status.order_transition() {
            debug_assert!(OrderStatus::PendingPayment.can_transition_to(next));
            order_status_changed = tx
                .compare_and_set_order_status(payment.order_id, OrderStatus::PendingPayment, next)
                .await?;
            if !order_status_changed {
                tracing::warn!(
                    payment_id = %payment.id,
                    order_id = %payment.order_id,
                    wanted = %next,
                    "Order no longer pending payment; status left unchanged"
                );
            }
        }

        tx.commit().await?;

        tracing::info!(
            payment_id = %payment.id,
            order_id = %payment.order_id,
            status = %new_status,
            order_status_changed,
            "Webhook applied"
        );
        Ok(WebhookOutcome {
            payment_id: payment.id,
            order_id: payment.order_id,
            status: new_status,
            order_status_changed,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::FailPoint;
    use crate::testing::Fixture;

    fn manual() -> ProviderName {
        ProviderName::manual()
    }

    #[tokio::test]
    async fn test_unknown_status_rejected_without_storage_access() {
        let fixture = Fixture::new().await;
        let begins = fixture.store.begin_count();

        let err = WebhookService::new(&fixture.store)
            .apply(&manual(), "anything", "weird", "{}")
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::InvalidStatus(_)));
        assert_eq!(fixture.store.begin_count(), begins);
    }

    #[tokio::test]
    async fn test_initiated_is_not_a_webhook_status() {
        let fixture = Fixture::new().await;
        let err = WebhookService::new(&fixture.store)
            .apply(&manual(), "anything", "initiated", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidStatus(_)));
    }

    #[tokio::test]
    async fn test_unknown_reference_is_not_found() {
        let fixture = Fixture::new().await;
        let err = WebhookService::new(&fixture.store)
            .apply(&manual(), "missing", "paid", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::NotFound));
    }

    #[tokio::test]
    async fn test_reference_is_scoped_to_provider() {
        let fixture = Fixture::new().await;
        let order = fixture.order_with(&[(fixture.tee, 1)]).await;
        let payment = fixture.initiate(order).await;

        let err = WebhookService::new(&fixture.store)
            .apply(
                &ProviderName::parse("xendit").unwrap(),
                &payment.provider_ref,
                "paid",
                "{}",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::NotFound));
    }

    #[tokio::test]
    async fn test_paid_webhook_settles_order() {
        let fixture = Fixture::new().await;
        let order = fixture.order_with(&[(fixture.tee, 2), (fixture.mug, 1)]).await;
        let payment = fixture.initiate(order).await;
        let body = r#"{"provider_ref":"x","status":"paid","extra":1}"#;

        let outcome = WebhookService::new(&fixture.store)
            .apply(&manual(), &payment.provider_ref, "paid", body)
            .await
            .unwrap();

        assert_eq!(outcome.payment_id, payment.payment_id);
        assert_eq!(outcome.order_id, order);
        assert_eq!(outcome.status, PaymentStatus::Paid);
        assert!(outcome.order_status_changed);

        let stored = fixture.store.payment(payment.payment_id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Paid);
        assert_eq!(stored.payload.as_deref(), Some(body));
        let order = fixture.store.get_order(order).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_failed_and_expired_cancel_order() {
        for status in ["failed", "expired"] {
            let fixture = Fixture::new().await;
            let order = fixture.order_with(&[(fixture.tee, 1)]).await;
            let payment = fixture.initiate(order).await;

            WebhookService::new(&fixture.store)
                .apply(&manual(), &payment.provider_ref, status, "{}")
                .await
                .unwrap();

            let order = fixture.store.get_order(order).await.unwrap().unwrap();
            assert_eq!(order.status, OrderStatus::Canceled, "{status}");
        }
    }

    #[tokio::test]
    async fn test_pending_and_refunded_leave_order_alone() {
        for status in ["pending", "refunded"] {
            let fixture = Fixture::new().await;
            let order = fixture.order_with(&[(fixture.tee, 1)]).await;
            let payment = fixture.initiate(order).await;

            let outcome = WebhookService::new(&fixture.store)
                .apply(&manual(), &payment.provider_ref, status, "{}")
                .await
                .unwrap();

            assert!(!outcome.order_status_changed, "{status}");
            let order = fixture.store.get_order(order).await.unwrap().unwrap();
            assert_eq!(order.status, OrderStatus::PendingPayment, "{status}");
        }
    }

    #[tokio::test]
    async fn test_replay_is_idempotent() {
        let fixture = Fixture::new().await;
        let order = fixture.order_with(&[(fixture.tee, 1)]).await;
        let payment = fixture.initiate(order).await;
        let service = WebhookService::new(&fixture.store);

        let first = service
            .apply(&manual(), &payment.provider_ref, "paid", "{\"n\":1}")
            .await
            .unwrap();
        let payment_after_first = fixture.store.payment(payment.payment_id).await.unwrap();
        let order_after_first = fixture.store.get_order(order).await.unwrap().unwrap();

        let second = service
            .apply(&manual(), &payment.provider_ref, "paid", "{\"n\":1}")
            .await
            .unwrap();
        let payment_after_second = fixture.store.payment(payment.payment_id).await.unwrap();
        let order_after_second = fixture.store.get_order(order).await.unwrap().unwrap();

        assert!(first.order_status_changed);
        assert!(!second.order_status_changed);
        assert_eq!(first.status, second.status);
        assert_eq!(payment_after_first.status, payment_after_second.status);
        assert_eq!(payment_after_first.payload, payment_after_second.payload);
        assert_eq!(order_after_first, order_after_second);
    }

    #[tokio::test]
    async fn test_paid_after_cancel_updates_payment_only() {
        let fixture = Fixture::new().await;
        let order = fixture.order_with(&[(fixture.tee, 1)]).await;
        let first = fixture.initiate(order).await;
        let second = fixture.initiate(order).await;
        let service = WebhookService::new(&fixture.store);

        service
            .apply(&manual(), &first.provider_ref, "expired", "{}")
            .await
            .unwrap();
        let outcome = service
            .apply(&manual(), &second.provider_ref, "paid", "{}")
            .await
            .unwrap();

        assert!(!outcome.order_status_changed);
        let payment = fixture.store.payment(second.payment_id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        let order = fixture.store.get_order(order).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn test_regression_is_applied() {
        let fixture = Fixture::new().await;
        let order = fixture.order_with(&[(fixture.tee, 1)]).await;
        let payment = fixture.initiate(order).await;
        let service = WebhookService::new(&fixture.store);

        service
            .apply(&manual(), &payment.provider_ref, "paid", "{}")
            .await
            .unwrap();
        service
            .apply(&manual(), &payment.provider_ref, "pending", "{}")
            .await
            .unwrap();

        let stored = fixture.store.payment(payment.payment_id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
        let order = fixture.store.get_order(order).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_failed_order_update_rolls_back_payment() {
        let fixture = Fixture::new().await;
        let order = fixture.order_with(&[(fixture.tee, 1)]).await;
        let payment = fixture.initiate(order).await;
        fixture
            .store
            .fail_on(FailPoint::CompareAndSetOrderStatus)
            .await;

        let err = WebhookService::new(&fixture.store)
            .apply(&manual(), &payment.provider_ref, "paid", "{}")
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::Repository(_)));
        fixture.store.clear_faults().await;
        let stored = fixture.store.payment(payment.payment_id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Initiated);
        assert!(stored.payload.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_paid_webhooks_flip_order_once() {
        let fixture = Arc::new(Fixture::new().await);
        let order = fixture.order_with(&[(fixture.tee, 1)]).await;
        let payment = fixture.initiate(order).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let fixture = Arc::clone(&fixture);
                let provider_ref = payment.provider_ref.clone();
                tokio::spawn(async move {
                    WebhookService::new(&fixture.store)
                        .apply(&manual(), &provider_ref, "paid", "{}")
                        .await
                })
            })
            .collect();

        let mut flips = 0;
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert_eq!(outcome.status, PaymentStatus::Paid);
            if outcome.order_status_changed {
                flips += 1;
            }
        }

        assert_eq!(flips, 1);
        let order = fixture.store.get_order(order).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }
}
