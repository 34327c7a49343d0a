//! Records for carts, orders and payments.
//!
//! These are validated domain types, separate from database row types.

pub mod cart;
pub mod order;
pub mod payment;

pub use cart::{Cart, CartItem};
pub use order::{
    DraftError, DraftItem, Order, OrderDraft, OrderItem, OrderNumber, OrderSummary, PricedLine,
};
pub use payment::{LockedPayment, NewPayment, Payment};
