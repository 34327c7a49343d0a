//! Checkout against `PostgreSQL`.
//!
//! These tests require a database reachable at `CARTAGE_TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p cartage-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use cartage_api::db::{RepositoryError, Store, UnitOfWork};
use cartage_api::services::{CheckoutError, CheckoutService, RandomReferences};
use cartage_core::{CartStatus, CurrencyCode, Money, OrderDraft, OrderNumber, OrderStatus};
use cartage_integration_tests::{TestContext, sample_address};

#[tokio::test]
#[ignore = "Requires CARTAGE_TEST_DATABASE_URL"]
async fn test_checkout_freezes_totals() {
    let ctx = TestContext::new().await;
    let a = ctx.variant(1000, true).await;
    let b = ctx.variant(500, true).await;
    let cart = ctx.cart_with(&[(a, 2), (b, 1)]).await;

    let order_id = CheckoutService::new(&ctx.store, &ctx.settings, &RandomReferences)
        .checkout(cart, sample_address())
        .await
        .unwrap();
    ctx.set_price(a, 9999).await;

    let order = ctx.store.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::PendingPayment);
    assert_eq!(order.subtotal.minor(), 2500);
    assert_eq!(order.discount_total.minor(), 0);
    assert_eq!(order.shipping_total.minor(), 0);
    assert_eq!(order.grand_total.minor(), 2500);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].variant_id, a);
    assert_eq!(order.items[0].unit_price.minor(), 1000);
    assert_eq!(order.items[0].line_total.minor(), 2000);
    assert_eq!(order.shipping_address, sample_address());

    let cart = ctx.store.get_cart(cart).await.unwrap().unwrap();
    assert_eq!(cart.status, CartStatus::Converted);
}

#[tokio::test]
#[ignore = "Requires CARTAGE_TEST_DATABASE_URL"]
async fn test_inactive_lines_are_skipped_and_empty_cart_stays_active() {
    let ctx = TestContext::new().await;
    let retired = ctx.variant(700, false).await;
    let hidden = ctx.variant_under(300, true, false).await;
    let cart = ctx.cart_with(&[(retired, 1), (hidden, 2)]).await;

    let err = CheckoutService::new(&ctx.store, &ctx.settings, &RandomReferences)
        .checkout(cart, sample_address())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    let cart_after = ctx.store.get_cart(cart).await.unwrap().unwrap();
    assert_eq!(cart_after.status, CartStatus::Active);
    assert_eq!(ctx.orders_for_cart(cart).await, 0);
}

#[tokio::test]
#[ignore = "Requires CARTAGE_TEST_DATABASE_URL"]
async fn test_concurrent_checkouts_create_one_order() {
    let ctx = TestContext::new().await;
    let a = ctx.variant(1000, true).await;
    let cart = ctx.cart_with(&[(a, 1)]).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = ctx.store.clone();
            let settings = ctx.settings.clone();
            tokio::spawn(async move {
                CheckoutService::new(&store, &settings, &RandomReferences)
                    .checkout(cart, sample_address())
                    .await
            })
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
    assert_eq!(ctx.orders_for_cart(cart).await, 1);
}

#[tokio::test]
#[ignore = "Requires CARTAGE_TEST_DATABASE_URL"]
async fn test_second_order_for_cart_is_conflict() {
    let ctx = TestContext::new().await;
    let a = ctx.variant(1000, true).await;
    let cart = ctx.cart_with(&[(a, 1)]).await;
    let draft = OrderDraft {
        currency: CurrencyCode::IDR,
        subtotal: Money::from_minor(1000),
        discount_total: Money::ZERO,
        shipping_total: Money::ZERO,
        grand_total: Money::from_minor(1000),
        items: Vec::new(),
        shipping_address: sample_address(),
    };
    let suffix = cart.to_string()[..6].to_uppercase();

    let mut tx = ctx.store.begin().await.unwrap();
    let first = OrderNumber::from_stored(format!("ORD-TEST1-{suffix}"));
    assert!(tx.insert_order(cart, &first, &draft).await.unwrap().is_some());

    let second = OrderNumber::from_stored(format!("ORD-TEST2-{suffix}"));
    let err = tx.insert_order(cart, &second, &draft).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)), "{err}");
}
