//! Storage for carts, orders and payments.
//!
//! # Database: `cartage`
//!
//! ## Tables
//!
//! - `products`, `product_variants` - Catalog snapshot (read-only here)
//! - `carts`, `cart_items` - Shopper carts
//! - `orders`, `order_items` - Immutable order ledger (status is the only mutable column)
//! - `payments` - Payment attempts keyed by `(provider, provider_ref)`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p cartage-cli -- migrate
//! ```
//!
//! # Units of work
//!
//! Every multi-statement operation goes through [`Store::begin`], which hands
//! out a [`UnitOfWork`]. Locks taken through a unit of work are held until it
//! is committed or dropped. Dropping without [`UnitOfWork::commit`] rolls
//! everything back.

mod carts;
mod catalog;
pub mod memory;
mod orders;
mod payments;
mod postgres;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use cartage_core::{
    Cart, CartId, CartItemId, CartStatus, DraftItem, LockedPayment, NewPayment, Order,
    OrderDraft, OrderId, OrderNumber, OrderStatus, OrderSummary, PaymentId, PaymentStatus,
    PricedLine, ProviderName, VariantId,
};

pub use catalog::{NewProduct, NewVariant, seed_product, variant_by_sku};
pub use memory::{FailPoint, MemoryStore};
pub use postgres::{PgStore, PgUnitOfWork};

/// Embedded schema migrations for the API database.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate key).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(2.min(max_connections))
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history is inconsistent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// A handle on durable storage.
///
/// Single-statement reads and the cart collaborator commands live here;
/// anything that must hold row locks across statements goes through
/// [`Store::begin`].
pub trait Store: Clone + Send + Sync + 'static {
    /// The unit of work type this store hands out.
    type Tx: UnitOfWork;

    /// Open a new unit of work.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, RepositoryError>> + Send;

    /// Load an order with its items.
    fn get_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Create an empty active cart.
    fn create_cart(&self) -> impl Future<Output = Result<CartId, RepositoryError>> + Send;

    /// Load a cart with its items in insertion order.
    fn get_cart(
        &self,
        id: CartId,
    ) -> impl Future<Output = Result<Option<Cart>, RepositoryError>> + Send;

    /// Insert an item or replace the quantity of the existing line for the
    /// same variant.
    ///
    /// Fails with [`RepositoryError::NotFound`] if the cart is missing or
    /// converted, or the variant does not exist.
    fn upsert_cart_item(
        &self,
        cart: CartId,
        variant: VariantId,
        qty: i32,
    ) -> impl Future<Output = Result<CartItemId, RepositoryError>> + Send;

    /// Set the quantity of an existing line.
    fn update_cart_item_qty(
        &self,
        cart: CartId,
        item: CartItemId,
        qty: i32,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Remove a line from an active cart.
    fn delete_cart_item(
        &self,
        cart: CartId,
        item: CartItemId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Check that storage is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// An open, all-or-nothing storage session.
pub trait UnitOfWork: Send {
    /// Lock a cart row exclusively and return its status.
    fn lock_cart(
        &mut self,
        id: CartId,
    ) -> impl Future<Output = Result<Option<CartStatus>, RepositoryError>> + Send;

    /// Read cart lines joined with the active catalog, in insertion order.
    ///
    /// Lines whose product or variant is inactive are left out.
    fn priced_cart_lines(
        &mut self,
        cart: CartId,
    ) -> impl Future<Output = Result<Vec<PricedLine>, RepositoryError>> + Send;

    /// Insert an order header in `pending_payment`.
    ///
    /// Returns `None` when `number` is already taken, and
    /// `RepositoryError::Conflict` when `cart` already has an order.
    fn insert_order(
        &mut self,
        cart: CartId,
        number: &OrderNumber,
        draft: &OrderDraft,
    ) -> impl Future<Output = Result<Option<OrderId>, RepositoryError>> + Send;

    /// Insert the frozen lines of an order, preserving their order.
    fn insert_order_items(
        &mut self,
        order: OrderId,
        items: &[DraftItem],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Flip a cart to `converted`.
    fn mark_cart_converted(
        &mut self,
        id: CartId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Read an order's payable fields under a shared row lock.
    fn lock_order(
        &mut self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<OrderSummary>, RepositoryError>> + Send;

    /// Insert a payment in `initiated`.
    ///
    /// Returns `None` when `(provider, provider_ref)` is already taken.
    fn insert_payment(
        &mut self,
        payment: &NewPayment,
    ) -> impl Future<Output = Result<Option<PaymentId>, RepositoryError>> + Send;

    /// Lock a payment row exclusively by its provider key.
    fn lock_payment(
        &mut self,
        provider: &ProviderName,
        provider_ref: &str,
    ) -> impl Future<Output = Result<Option<LockedPayment>, RepositoryError>> + Send;

    /// Overwrite a payment's status and last raw notification.
    fn update_payment(
        &mut self,
        id: PaymentId,
        status: PaymentStatus,
        payload: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Move an order to `next` only if its status is still `expected`.
    ///
    /// Returns whether a row changed. A miss is not an error.
    fn compare_and_set_order_status(
        &mut self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Make every write in this unit durable.
    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Map a foreign key violation to [`RepositoryError::NotFound`].
fn foreign_key_as_not_found(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::NotFound;
    }
    RepositoryError::Database(e)
}

/// Map a unique-key violation to `Conflict`.
fn unique_as_conflict(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(db_err.message().to_owned());
    }
    RepositoryError::Database(e)
}

/// Parse a stored status column, reporting bad values as corruption.
fn parse_stored<T>(column: &str, value: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}
