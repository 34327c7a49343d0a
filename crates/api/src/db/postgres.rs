//! `PostgreSQL` implementation of [`Store`] and [`UnitOfWork`].

use sqlx::{PgPool, Postgres, Transaction};

use cartage_core::{
    Cart, CartId, CartItemId, CartStatus, DraftItem, LockedPayment, NewPayment, Order,
    OrderDraft, OrderId, OrderNumber, OrderStatus, OrderSummary, PaymentId, PaymentStatus,
    PricedLine, ProviderName, VariantId,
};

use super::{RepositoryError, Store, UnitOfWork, carts, orders, payments};

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// A `PostgreSQL` transaction. Rolled back on drop unless committed.
#[derive(Debug)]
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl Store for PgStore {
    type Tx = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork { tx })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        orders::get(&mut conn, id).await
    }

    async fn create_cart(&self) -> Result<CartId, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        carts::create(&mut conn).await
    }

    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        carts::get(&mut conn, id).await
    }

    async fn upsert_cart_item(
        &self,
        cart: CartId,
        variant: VariantId,
        qty: i32,
    ) -> Result<CartItemId, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let id = carts::upsert_item(&mut tx, cart, variant, qty).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update_cart_item_qty(
        &self,
        cart: CartId,
        item: CartItemId,
        qty: i32,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        carts::update_item_qty(&mut tx, cart, item, qty).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_cart_item(&self, cart: CartId, item: CartItemId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        carts::delete_item(&mut tx, cart, item).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

impl UnitOfWork for PgUnitOfWork {
    async fn lock_cart(&mut self, id: CartId) -> Result<Option<CartStatus>, RepositoryError> {
        carts::lock(&mut self.tx, id).await
    }

    async fn priced_cart_lines(&mut self, cart: CartId) -> Result<Vec<PricedLine>, RepositoryError> {
        carts::priced_lines(&mut self.tx, cart).await
    }

    async fn insert_order(
        &mut self,
        cart: CartId,
        number: &OrderNumber,
        draft: &OrderDraft,
    ) -> Result<Option<OrderId>, RepositoryError> {
        orders::insert(&mut self.tx, cart, number, draft).await
    }

    async fn insert_order_items(
        &mut self,
        order: OrderId,
        items: &[DraftItem],
    ) -> Result<(), RepositoryError> {
        orders::insert_items(&mut self.tx, order, items).await
    }

    async fn mark_cart_converted(&mut self, id: CartId) -> Result<(), RepositoryError> {
        carts::mark_converted(&mut self.tx, id).await
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderSummary>, RepositoryError> {
        orders::lock_summary(&mut self.tx, id).await
    }

    async fn insert_payment(
        &mut self,
        payment: &NewPayment,
    ) -> Result<Option<PaymentId>, RepositoryError> {
        payments::insert(&mut self.tx, payment).await
    }

    async fn lock_payment(
        &mut self,
        provider: &ProviderName,
        provider_ref: &str,
    ) -> Result<Option<LockedPayment>, RepositoryError> {
        payments::lock(&mut self.tx, provider, provider_ref).await
    }

    async fn update_payment(
        &mut self,
        id: PaymentId,
        status: PaymentStatus,
        payload: &str,
    ) -> Result<(), RepositoryError> {
        payments::update(&mut self.tx, id, status, payload).await
    }

    async fn compare_and_set_order_status(
        &mut self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        orders::compare_and_set_status(&mut self.tx, id, expected, next).await
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
