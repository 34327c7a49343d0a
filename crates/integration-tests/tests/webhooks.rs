//! Webhook reconciliation against `PostgreSQL`.
//!
//! These tests require a database reachable at `CARTAGE_TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p cartage-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use cartage_api::db::Store;
use cartage_api::services::{WebhookError, WebhookService};
use cartage_core::{OrderStatus, ProviderName};
use cartage_integration_tests::TestContext;

#[tokio::test]
#[ignore = "Requires CARTAGE_TEST_DATABASE_URL"]
async fn test_replay_is_idempotent() {
    let ctx = TestContext::new().await;
    let a = ctx.variant(1000, true).await;
    let order = ctx.order_with(&[(a, 1)]).await;
    let payment = ctx.initiate(order).await;
    let service = WebhookService::new(&ctx.store);
    let body = r#"{"provider_ref":"x","status":"paid"}"#;

    service
        .apply(&ProviderName::manual(), &payment.provider_ref, "paid", body)
        .await
        .unwrap();
    let first = (
        ctx.payment_row(&payment).await,
        ctx.store.get_order(order).await.unwrap(),
    );

    let replay = service
        .apply(&ProviderName::manual(), &payment.provider_ref, "paid", body)
        .await
        .unwrap();
    let second = (
        ctx.payment_row(&payment).await,
        ctx.store.get_order(order).await.unwrap(),
    );

    assert!(!replay.order_status_changed);
    assert_eq!(first, second);
    assert_eq!(first.0.0, "paid");
    assert_eq!(first.1.unwrap().status, OrderStatus::Paid);
}

#[tokio::test]
#[ignore = "Requires CARTAGE_TEST_DATABASE_URL"]
async fn test_concurrent_paid_webhooks_flip_order_once() {
    let ctx = TestContext::new().await;
    let a = ctx.variant(1000, true).await;
    let order = ctx.order_with(&[(a, 1)]).await;
    let payment = ctx.initiate(order).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = ctx.store.clone();
            let provider_ref = payment.provider_ref.clone();
            tokio::spawn(async move {
                WebhookService::new(&store)
                    .apply(&ProviderName::manual(), &provider_ref, "paid", "{}")
                    .await
            })
        })
        .collect();

    let mut flips = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().order_status_changed {
            flips += 1;
        }
    }

    assert_eq!(flips, 1);
    let order = ctx.store.get_order(order).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
}

#[tokio::test]
#[ignore = "Requires CARTAGE_TEST_DATABASE_URL"]
async fn test_paid_after_cancel_updates_payment_only() {
    let ctx = TestContext::new().await;
    let a = ctx.variant(1000, true).await;
    let order = ctx.order_with(&[(a, 1)]).await;
    let first = ctx.initiate(order).await;
    let second = ctx.initiate(order).await;
    let service = WebhookService::new(&ctx.store);

    service
        .apply(&ProviderName::manual(), &first.provider_ref, "failed", "{}")
        .await
        .unwrap();
    service
        .apply(&ProviderName::manual(), &second.provider_ref, "paid", "{}")
        .await
        .unwrap();

    assert_eq!(ctx.payment_row(&second).await.0, "paid");
    let order = ctx.store.get_order(order).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Canceled);
}

#[tokio::test]
#[ignore = "Requires CARTAGE_TEST_DATABASE_URL"]
async fn test_unknown_reference_is_not_found() {
    let ctx = TestContext::new().await;
    let err = WebhookService::new(&ctx.store)
        .apply(&ProviderName::manual(), "does-not-exist", "paid", "{}")
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::NotFound));
}
