//! Cartage Core - Shared domain types.
//!
//! This crate provides the types used across all Cartage components:
//! - `api` - HTTP service for checkout, orders, payments and webhooks
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP. Pricing an order draft, validating a shipping address and
//! mapping a provider notification onto an order transition all live here so
//! they can be tested without a store.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, statuses, provider names, addresses
//! - [`models`] - Cart, order and payment records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;

pub use models::*;
pub use types::*;
