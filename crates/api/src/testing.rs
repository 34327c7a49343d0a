//! Shared fixtures for unit tests.

#![allow(clippy::unwrap_used)]

use cartage_core::{CartId, Money, OrderId, ProviderName, ShippingAddress, VariantId};

use crate::config::CheckoutSettings;
use crate::db::{MemoryStore, Store};
use crate::services::{
    CheckoutService, InitiatedPayment, PaymentService, RandomReferences, WebhookService,
};

/// An already-normalized address.
pub(crate) fn sample_address() -> ShippingAddress {
    ShippingAddress {
        recipient_name: "Siti Rahma".to_owned(),
        phone: "+6281234567890".to_owned(),
        address_line1: "Jl. Braga No. 12".to_owned(),
        address_line2: None,
        city: "Bandung".to_owned(),
        province: "Jawa Barat".to_owned(),
        postal_code: "40111".to_owned(),
        country: "ID".to_owned(),
    }
}

/// A memory store with a small catalog.
///
/// - `tee` and `mug` are active variants priced 1000 and 500.
/// - `retired` is an inactive variant of an active product.
/// - `hidden_product_variant` is active but its product is not.
pub(crate) struct Fixture {
    pub store: MemoryStore,
    pub settings: CheckoutSettings,
    pub tee: VariantId,
    pub mug: VariantId,
    pub retired: VariantId,
    pub hidden_product_variant: VariantId,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = MemoryStore::new();

        let shop = store.add_product(true).await;
        let tee = store
            .add_variant(shop, "TEE", Money::from_minor(1000), true)
            .await;
        let mug = store
            .add_variant(shop, "MUG", Money::from_minor(500), true)
            .await;
        let retired = store
            .add_variant(shop, "RETIRED", Money::from_minor(700), false)
            .await;

        let hidden = store.add_product(false).await;
        let hidden_product_variant = store
            .add_variant(hidden, "HIDDEN", Money::from_minor(300), true)
            .await;

        Self {
            store,
            settings: CheckoutSettings::default(),
            tee,
            mug,
            retired,
            hidden_product_variant,
        }
    }

    /// Create a cart holding `lines`.
    pub async fn cart_with(&self, lines: &[(VariantId, i32)]) -> CartId {
        let cart = self.store.create_cart().await.unwrap();
        for (variant, qty) in lines {
            self.store.upsert_cart_item(cart, *variant, *qty).await.unwrap();
        }
        cart
    }

    /// Check out a fresh cart holding `lines`.
    pub async fn order_with(&self, lines: &[(VariantId, i32)]) -> OrderId {
        let cart = self.cart_with(lines).await;
        CheckoutService::new(&self.store, &self.settings, &RandomReferences)
            .checkout(cart, sample_address())
            .await
            .unwrap()
    }

    /// Initiate a payment with the default provider.
    pub async fn initiate(&self, order: OrderId) -> InitiatedPayment {
        PaymentService::new(&self.store, &self.settings, &RandomReferences)
            .initiate(order, None)
            .await
            .unwrap()
    }

    /// Initiate a payment and immediately report `status` for it.
    pub async fn settle(&self, order: OrderId, status: &str) -> InitiatedPayment {
        let payment = self.initiate(order).await;
        WebhookService::new(&self.store)
            .apply(&ProviderName::manual(), &payment.provider_ref, status, "{}")
            .await
            .unwrap();
        payment
    }
}
