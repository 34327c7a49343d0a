//! Core types for Cartage.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod id;
pub mod money;
pub mod provider;
pub mod status;

pub use address::{AddressError, ShippingAddress};
pub use id::*;
pub use money::{CurrencyCode, Money, ParseCurrencyError};
pub use provider::{ProviderError, ProviderName};
pub use status::*;
