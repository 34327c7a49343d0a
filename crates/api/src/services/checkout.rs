//! Checkout: turn an active cart into an immutable order.

use thiserror::Error;
use tracing::instrument;

use cartage_core::{
    AddressError, CartId, CartStatus, DraftError, OrderDraft, OrderId, OrderNumber,
    ShippingAddress,
};

use super::ReferenceGenerator;
use crate::config::CheckoutSettings;
use crate::db::{RepositoryError, Store, UnitOfWork};

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The shipping address failed validation.
    #[error("invalid shipping address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// No cart with this id exists.
    #[error("cart not found")]
    NotFound,

    /// The cart has already been checked out.
    #[error("cart already converted")]
    CartConverted,

    /// No purchasable lines remained.
    #[error("cart is empty")]
    EmptyCart,

    /// An order total overflowed.
    #[error("order total overflows")]
    Overflow,

    /// Every generated order number collided.
    #[error("no unique order number after {0} attempts")]
    ReferencesExhausted(u32),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<DraftError> for CheckoutError {
    fn from(err: DraftError) -> Self {
        match err {
            DraftError::Empty => Self::EmptyCart,
            DraftError::Overflow => Self::Overflow,
        }
    }
}

/// Checkout service.
pub struct CheckoutService<'a, S> {
    store: &'a S,
    settings: &'a CheckoutSettings,
    references: &'a dyn ReferenceGenerator,
}

impl<'a, S: Store> CheckoutService<'a, S> {
    /// Create a new checkout service.
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

    /// Convert a cart into an order in `pending_payment`.
    ///
    /// The cart row stays locked from the first read until commit, so a
    /// concurrent checkout of the same cart waits and then sees it converted.
    /// Any error drops the unit of work, leaving no order and an active cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidAddress` before touching storage if the
    /// address is invalid, `NotFound` / `CartConverted` for an unusable cart,
    /// `EmptyCart` if nothing purchasable remains, and `Repository`,
    /// `Overflow` or `ReferencesExhausted` for internal failures.
    #[instrument(skip(self, address), fields(cart_id = %cart_id))]
    pub async fn checkout(
        &self,
        cart_id: CartId,
        address: ShippingAddress,
    ) -> Result<OrderId, CheckoutError> {
        let address = address.normalized()?;

        let mut tx = self.store.begin().await?;

        match tx.lock_cart(cart_id).await? {
            Some(CartStatus::Active) => {}
            Some(CartStatus::Converted) => return Err(CheckoutError::CartConverted),
            None => return Err(CheckoutError::NotFound),
        }

        let lines = tx.priced_cart_lines(cart_id).await?;
        let draft = OrderDraft::price(self.settings.currency, lines, address)?;

        let (order_id, order_number) = self.insert_order(&mut tx, cart_id, &draft).await?;
        tx.insert_order_items(order_id, &draft.items).await?;
        tx.mark_cart_converted(cart_id).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            order_number = %order_number,
            items = draft.items.len(),
            grand_total = %draft.grand_total,
            "Order created"
        );
        Ok(order_id)
    }

    /// Insert the order header under a fresh order number, retrying on
    /// collisions.
    async fn insert_order(
        &self,
        tx: &mut S::Tx,
        cart_id: CartId,
        draft: &OrderDraft,
    ) -> Result<(OrderId, OrderNumber), CheckoutError> {
        let attempts = self.settings.id_retry_attempts;
        for attempt in 1..=attempts {
            let number = self.references.order_number();
            if let Some(id) = tx.insert_order(cart_id, &number, draft).await? {
                return Ok((id, number));
            }
            tracing::debug!(attempt, order_number = %number, "Order number collision");
        }
        Err(CheckoutError::ReferencesExhausted(attempts))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use cartage_core::{Money, OrderStatus};

    use super::*;
    use crate::db::FailPoint;
    use crate::services::{RandomReferences, ScriptedReferences};
    use crate::testing::{Fixture, sample_address};

    async fn checkout(fixture: &Fixture, cart: CartId) -> Result<OrderId, CheckoutError> {
        CheckoutService::new(&fixture.store, &fixture.settings, &RandomReferences)
            .checkout(cart, sample_address())
            .await
    }

    #[tokio::test]
    async fn test_checkout_freezes_prices_and_converts_cart() {
        let fixture = Fixture::new().await;
        let cart = fixture.cart_with(&[(fixture.tee, 2), (fixture.mug, 1)]).await;

        let order_id = checkout(&fixture, cart).await.unwrap();

        let order = fixture.store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.subtotal, Money::from_minor(2500));
        assert_eq!(order.discount_total, Money::ZERO);
        assert_eq!(order.shipping_total, Money::ZERO);
        assert_eq!(order.grand_total, Money::from_minor(2500));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].sku, "TEE");
        assert_eq!(order.items[0].line_total, Money::from_minor(2000));
        assert_eq!(order.items[1].sku, "MUG");
        assert_eq!(order.shipping_address, sample_address());

        let cart = fixture.store.get_cart(cart).await.unwrap().unwrap();
        assert_eq!(cart.status, CartStatus::Converted);
    }

    #[tokio::test]
    async fn test_order_items_ignore_later_catalog_changes() {
        let fixture = Fixture::new().await;
        let cart = fixture.cart_with(&[(fixture.tee, 1)]).await;
        let order_id = checkout(&fixture, cart).await.unwrap();

        fixture
            .store
            .set_variant_price(fixture.tee, Money::from_minor(9999))
            .await;

        let order = fixture.store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.items[0].unit_price, Money::from_minor(1000));
    }

    #[tokio::test]
    async fn test_second_checkout_of_same_cart_fails() {
        let fixture = Fixture::new().await;
        let cart = fixture.cart_with(&[(fixture.tee, 1)]).await;

        checkout(&fixture, cart).await.unwrap();
        let err = checkout(&fixture, cart).await.unwrap_err();

        assert!(matches!(err, CheckoutError::CartConverted));
        assert_eq!(fixture.store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_missing_cart_is_not_found() {
        let fixture = Fixture::new().await;
        let err = checkout(&fixture, CartId::generate()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::NotFound));
    }

    #[tokio::test]
    async fn test_empty_cart_stays_active() {
        let fixture = Fixture::new().await;
        let cart = fixture.cart_with(&[]).await;

        let err = checkout(&fixture, cart).await.unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        let cart = fixture.store.get_cart(cart).await.unwrap().unwrap();
        assert_eq!(cart.status, CartStatus::Active);
        assert_eq!(fixture.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_cart_of_inactive_variants_is_empty() {
        let fixture = Fixture::new().await;
        let cart = fixture
            .cart_with(&[(fixture.retired, 3), (fixture.hidden_product_variant, 1)])
            .await;

        let err = checkout(&fixture, cart).await.unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        let cart = fixture.store.get_cart(cart).await.unwrap().unwrap();
        assert_eq!(cart.status, CartStatus::Active);
    }

    #[tokio::test]
    async fn test_inactive_lines_are_dropped_from_order() {
        let fixture = Fixture::new().await;
        let cart = fixture
            .cart_with(&[(fixture.tee, 1), (fixture.retired, 5)])
            .await;

        let order_id = checkout(&fixture, cart).await.unwrap();

        let order = fixture.store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.grand_total, Money::from_minor(1000));
    }

    #[tokio::test]
    async fn test_invalid_address_rejected_before_storage() {
        let fixture = Fixture::new().await;
        let cart = fixture.cart_with(&[(fixture.tee, 1)]).await;
        let address = ShippingAddress {
            recipient_name: String::new(),
            ..sample_address()
        };
        let begins = fixture.store.begin_count();

        let err = CheckoutService::new(&fixture.store, &fixture.settings, &RandomReferences)
            .checkout(cart, address)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InvalidAddress(_)));
        assert_eq!(fixture.store.begin_count(), begins);
    }

    #[tokio::test]
    async fn test_failure_after_order_insert_rolls_everything_back() {
        for point in [
            FailPoint::InsertOrderItems,
            FailPoint::MarkCartConverted,
            FailPoint::Commit,
        ] {
            let fixture = Fixture::new().await;
            let cart = fixture.cart_with(&[(fixture.tee, 2), (fixture.mug, 1)]).await;
            fixture.store.fail_on(point).await;

            let err = checkout(&fixture, cart).await.unwrap_err();
            assert!(matches!(err, CheckoutError::Repository(_)), "{point:?}");

            fixture.store.clear_faults().await;
            assert_eq!(fixture.store.order_count().await, 0, "{point:?}");
            assert_eq!(fixture.store.order_item_count().await, 0, "{point:?}");
            let cart = fixture.store.get_cart(cart).await.unwrap().unwrap();
            assert_eq!(cart.status, CartStatus::Active, "{point:?}");
        }
    }

    #[tokio::test]
    async fn test_order_number_collision_is_retried() {
        let fixture = Fixture::new().await;
        let first_cart = fixture.cart_with(&[(fixture.tee, 1)]).await;
        let second_cart = fixture.cart_with(&[(fixture.mug, 1)]).await;
        let references = ScriptedReferences::with_order_numbers(&[
            "ORD-20260101-AAAAAA",
            "ORD-20260101-AAAAAA",
            "ORD-20260101-BBBBBB",
        ]);
        let service = CheckoutService::new(&fixture.store, &fixture.settings, &references);

        let first = service.checkout(first_cart, sample_address()).await.unwrap();
        let second = service
            .checkout(second_cart, sample_address())
            .await
            .unwrap();

        let second = fixture.store.get_order(second).await.unwrap().unwrap();
        let first = fixture.store.get_order(first).await.unwrap().unwrap();
        assert_eq!(first.order_number.as_str(), "ORD-20260101-AAAAAA");
        assert_eq!(second.order_number.as_str(), "ORD-20260101-BBBBBB");
    }

    #[tokio::test]
    async fn test_order_number_retries_are_bounded() {
        let mut fixture = Fixture::new().await;
        fixture.settings.id_retry_attempts = 2;
        let first_cart = fixture.cart_with(&[(fixture.tee, 1)]).await;
        let second_cart = fixture.cart_with(&[(fixture.mug, 1)]).await;
        let references = ScriptedReferences::with_order_numbers(&["ORD-X", "ORD-X", "ORD-X"]);
        let service = CheckoutService::new(&fixture.store, &fixture.settings, &references);

        service.checkout(first_cart, sample_address()).await.unwrap();
        let err = service
            .checkout(second_cart, sample_address())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::ReferencesExhausted(2)));
        let cart = fixture.store.get_cart(second_cart).await.unwrap().unwrap();
        assert_eq!(cart.status, CartStatus::Active);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_create_exactly_one_order() {
        let fixture = Arc::new(Fixture::new().await);
        let cart = fixture.cart_with(&[(fixture.tee, 2), (fixture.mug, 1)]).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let fixture = Arc::clone(&fixture);
                tokio::spawn(async move { checkout(&fixture, cart).await })
            })
            .collect();

        let mut created = 0;
        let mut converted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(CheckoutError::CartConverted) => converted += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(converted, 7);
        assert_eq!(fixture.store.order_count().await, 1);
    }
}
