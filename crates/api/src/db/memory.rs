//! In-memory [`Store`] for tests and local experiments.
//!
//! A unit of work holds the store-wide lock for its whole lifetime and
//! writes into a staged copy of the state. `commit` publishes the copy;
//! dropping the unit discards it. This is coarser than row locking but gives
//! the same guarantees for lock/read/write sequences.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use cartage_core::{
    Cart, CartId, CartItem, CartItemId, CartStatus, DraftItem, LockedPayment, Money, NewPayment,
    Order, OrderDraft, OrderId, OrderItem, OrderItemId, OrderNumber, OrderStatus, OrderSummary,
    Payment, PaymentId, PaymentStatus, PricedLine, ProductId, ProviderName, VariantId,
};

use super::{RepositoryError, Store, UnitOfWork};

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertOrder,
    InsertOrderItems,
    MarkCartConverted,
    InsertPayment,
    UpdatePayment,
    CompareAndSetOrderStatus,
    Commit,
}

#[derive(Debug, Clone)]
struct ProductRecord {
    is_active: bool,
}

#[derive(Debug, Clone)]
struct VariantRecord {
    product_id: ProductId,
    sku: String,
    name: String,
    price: Money,
    is_active: bool,
}

#[derive(Debug, Clone)]
struct CartRecord {
    status: CartStatus,
    items: Vec<CartItem>,
}

#[derive(Debug, Clone)]
struct OrderRecord {
    cart_id: CartId,
    order: Order,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<ProductId, ProductRecord>,
    variants: HashMap<VariantId, VariantRecord>,
    carts: HashMap<CartId, CartRecord>,
    orders: HashMap<OrderId, OrderRecord>,
    payments: HashMap<PaymentId, Payment>,
    faults: HashSet<FailPoint>,
}

impl MemoryState {
    fn check(&self, point: FailPoint) -> Result<(), RepositoryError> {
        if self.faults.contains(&point) {
            return Err(RepositoryError::DataCorruption(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }

    fn active_cart_mut(&mut self, id: CartId) -> Result<&mut CartRecord, RepositoryError> {
        self.carts
            .get_mut(&id)
            .filter(|cart| cart.status == CartStatus::Active)
            .ok_or(RepositoryError::NotFound)
    }
}

/// A [`Store`] that keeps everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    begins: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog product.
    pub async fn add_product(&self, is_active: bool) -> ProductId {
        let id = ProductId::generate();
        self.state
            .lock()
            .await
            .products
            .insert(id, ProductRecord { is_active });
        id
    }

    /// Add a variant under `product`.
    pub async fn add_variant(
        &self,
        product: ProductId,
        sku: &str,
        price: Money,
        is_active: bool,
    ) -> VariantId {
        let id = VariantId::generate();
        self.state.lock().await.variants.insert(
            id,
            VariantRecord {
                product_id: product,
                sku: sku.to_owned(),
                name: format!("Variant {sku}"),
                price,
                is_active,
            },
        );
        id
    }

    /// Change a variant's price, as a catalog update would.
    pub async fn set_variant_price(&self, id: VariantId, price: Money) {
        if let Some(variant) = self.state.lock().await.variants.get_mut(&id) {
            variant.price = price;
        }
    }

    /// Make `point` fail until [`MemoryStore::clear_faults`] is called.
    pub async fn fail_on(&self, point: FailPoint) {
        self.state.lock().await.faults.insert(point);
    }

    /// Remove all injected failures.
    pub async fn clear_faults(&self) {
        self.state.lock().await.faults.clear();
    }

    /// Number of units of work opened so far.
    #[must_use]
    pub fn begin_count(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    /// Number of orders in the ledger.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Number of order lines across all orders.
    pub async fn order_item_count(&self) -> usize {
        self.state
            .lock()
            .await
            .orders
            .values()
            .map(|record| record.order.items.len())
            .sum()
    }

    /// Fetch a payment by id.
    pub async fn payment(&self, id: PaymentId) -> Option<Payment> {
        self.state.lock().await.payments.get(&id).cloned()
    }

    /// All payments recorded against an order.
    pub async fn payments_for_order(&self, order: OrderId) -> Vec<Payment> {
        let state = self.state.lock().await;
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.order_id == order)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.created_at);
        payments
    }
}

/// A unit of work over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl Store for MemoryStore {
    type Tx = MemoryUnitOfWork;

    async fn begin(&self) -> Result<MemoryUnitOfWork, RepositoryError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryUnitOfWork { guard, staged })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&id).map(|record| record.order.clone()))
    }

    async fn create_cart(&self) -> Result<CartId, RepositoryError> {
        let id = CartId::generate();
        self.state.lock().await.carts.insert(
            id,
            CartRecord {
                status: CartStatus::Active,
                items: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.carts.get(&id).map(|record| Cart {
            id,
            status: record.status,
            items: record.items.clone(),
        }))
    }

    async fn upsert_cart_item(
        &self,
        cart: CartId,
        variant: VariantId,
        qty: i32,
    ) -> Result<CartItemId, RepositoryError> {
        let mut state = self.state.lock().await;
        if !state.variants.contains_key(&variant) {
            return Err(RepositoryError::NotFound);
        }
        let record = state.active_cart_mut(cart)?;

        if let Some(item) = record.items.iter_mut().find(|i| i.variant_id == variant) {
            item.qty = qty;
            return Ok(item.id);
        }

        let id = CartItemId::generate();
        record.items.push(CartItem {
            id,
            variant_id: variant,
            qty,
        });
        Ok(id)
    }

    async fn update_cart_item_qty(
        &self,
        cart: CartId,
        item: CartItemId,
        qty: i32,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let record = state.active_cart_mut(cart)?;
        let line = record
            .items
            .iter_mut()
            .find(|i| i.id == item)
            .ok_or(RepositoryError::NotFound)?;
        line.qty = qty;
        Ok(())
    }

    async fn delete_cart_item(&self, cart: CartId, item: CartItemId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let record = state.active_cart_mut(cart)?;
        let before = record.items.len();
        record.items.retain(|i| i.id != item);
        if record.items.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_cart(&mut self, id: CartId) -> Result<Option<CartStatus>, RepositoryError> {
        Ok(self.staged.carts.get(&id).map(|cart| cart.status))
    }

    async fn priced_cart_lines(&mut self, cart: CartId) -> Result<Vec<PricedLine>, RepositoryError> {
        let state = &self.staged;
        let Some(record) = state.carts.get(&cart) else {
            return Ok(Vec::new());
        };

        Ok(record
            .items
            .iter()
            .filter_map(|item| {
                let variant = state.variants.get(&item.variant_id)?;
                let product = state.products.get(&variant.product_id)?;
                (variant.is_active && product.is_active).then(|| PricedLine {
                    variant_id: item.variant_id,
                    sku: variant.sku.clone(),
                    name: variant.name.clone(),
                    unit_price: variant.price,
                    qty: item.qty,
                })
            })
            .collect())
    }

    async fn insert_order(
        &mut self,
        cart: CartId,
        number: &OrderNumber,
        draft: &OrderDraft,
    ) -> Result<Option<OrderId>, RepositoryError> {
        self.staged.check(FailPoint::InsertOrder)?;

        if self
            .staged
            .orders
            .values()
            .any(|record| &record.order.order_number == number)
        {
            return Ok(None);
        }
        if self.staged.orders.values().any(|record| record.cart_id == cart) {
            return Err(RepositoryError::Conflict("cart already has an order".to_owned()));
        }

        let id = OrderId::generate();
        let order = Order {
            id,
            order_number: number.clone(),
            status: OrderStatus::PendingPayment,
            currency: draft.currency,
            subtotal: draft.subtotal,
            discount_total: draft.discount_total,
            shipping_total: draft.shipping_total,
            grand_total: draft.grand_total,
            shipping_address: draft.shipping_address.clone(),
            items: Vec::new(),
            created_at: Utc::now(),
        };
        self.staged
            .orders
            .insert(id, OrderRecord { cart_id: cart, order });
        Ok(Some(id))
    }

    async fn insert_order_items(
        &mut self,
        order: OrderId,
        items: &[DraftItem],
    ) -> Result<(), RepositoryError> {
        self.staged.check(FailPoint::InsertOrderItems)?;

        let record = self
            .staged
            .orders
            .get_mut(&order)
            .ok_or(RepositoryError::NotFound)?;
        record.order.items.extend(items.iter().map(|item| OrderItem {
            id: OrderItemId::generate(),
            variant_id: item.variant_id,
            sku: item.sku.clone(),
            name: item.name.clone(),
            unit_price: item.unit_price,
            qty: item.qty,
            line_total: item.line_total,
        }));
        Ok(())
    }

    async fn mark_cart_converted(&mut self, id: CartId) -> Result<(), RepositoryError> {
        self.staged.check(FailPoint::MarkCartConverted)?;
        self.staged.active_cart_mut(id)?.status = CartStatus::Converted;
        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderSummary>, RepositoryError> {
        Ok(self.staged.orders.get(&id).map(|record| OrderSummary {
            status: record.order.status,
            currency: record.order.currency,
            grand_total: record.order.grand_total,
        }))
    }

    async fn insert_payment(
        &mut self,
        payment: &NewPayment,
    ) -> Result<Option<PaymentId>, RepositoryError> {
        self.staged.check(FailPoint::InsertPayment)?;

        if !self.staged.orders.contains_key(&payment.order_id) {
            return Err(RepositoryError::NotFound);
        }
        if self
            .staged
            .payments
            .values()
            .any(|p| p.provider == payment.provider && p.provider_ref == payment.provider_ref)
        {
            return Ok(None);
        }

        let id = PaymentId::generate();
        let now = Utc::now();
        self.staged.payments.insert(
            id,
            Payment {
                id,
                order_id: payment.order_id,
                provider: payment.provider.clone(),
                provider_ref: payment.provider_ref.clone(),
                status: PaymentStatus::Initiated,
                amount: payment.amount,
                payload: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(Some(id))
    }

    async fn lock_payment(
        &mut self,
        provider: &ProviderName,
        provider_ref: &str,
    ) -> Result<Option<LockedPayment>, RepositoryError> {
        Ok(self
            .staged
            .payments
            .values()
            .find(|p| &p.provider == provider && p.provider_ref == provider_ref)
            .map(|p| LockedPayment {
                id: p.id,
                order_id: p.order_id,
                status: p.status,
            }))
    }

    async fn update_payment(
        &mut self,
        id: PaymentId,
        status: PaymentStatus,
        payload: &str,
    ) -> Result<(), RepositoryError> {
        self.staged.check(FailPoint::UpdatePayment)?;

        let payment = self
            .staged
            .payments
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        payment.status = status;
        payment.payload = Some(payload.to_owned());
        payment.updated_at = Utc::now();
        Ok(())
    }

    async fn compare_and_set_order_status(
        &mut self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        self.staged.check(FailPoint::CompareAndSetOrderStatus)?;

        match self.staged.orders.get_mut(&id) {
            Some(record) if record.order.status == expected => {
                record.order.status = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(mut self) -> Result<(), RepositoryError> {
        self.staged.check(FailPoint::Commit)?;
        *self.guard = self.staged;
        Ok(())
    }
}
