//! Shipping address snapshot.
//!
//! An order stores its own copy of the address it ships to. The copy is taken
//! at checkout and is never linked back to an address book entry.

use serde::{Deserialize, Serialize};

/// Errors that can occur when validating a [`ShippingAddress`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A required field is missing or blank.
    #[error("{0} is required")]
    Missing(&'static str),
    /// A field exceeds its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
}

/// A shipping address as submitted at checkout.
///
/// Deserialization accepts any strings; call [`ShippingAddress::validate`]
/// (or [`ShippingAddress::normalized`]) before persisting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShippingAddress {
    pub recipient_name: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Maximum length of any single address field.
    pub const MAX_FIELD_LENGTH: usize = 200;

    /// Check that every required field is present and within bounds.
    ///
    /// # Errors
    ///
    /// Returns the first [`AddressError`] found, in field order.
    pub fn validate(&self) -> Result<(), AddressError> {
        let required = [
            ("recipient_name", &self.recipient_name),
            ("phone", &self.phone),
            ("address_line1", &self.address_line1),
            ("city", &self.city),
            ("province", &self.province),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AddressError::Missing(field));
            }
            check_length(field, value)?;
        }

        if let Some(line2) = &self.address_line2 {
            check_length("address_line2", line2)?;
        }

        Ok(())
    }

    /// Trim every field, drop a blank second line, then validate.
    ///
    /// # Errors
    ///
    /// Returns an [`AddressError`] if the trimmed address is invalid.
    pub fn normalized(self) -> Result<Self, AddressError> {
        let trim = |s: String| s.trim().to_owned();
        let address = Self {
            recipient_name: trim(self.recipient_name),
            phone: trim(self.phone),
            address_line1: trim(self.address_line1),
            address_line2: self
                .address_line2
                .map(trim)
                .filter(|line| !line.is_empty()),
            city: trim(self.city),
            province: trim(self.province),
            postal_code: trim(self.postal_code),
            country: trim(self.country),
        };
        address.validate()?;
        Ok(address)
    }
}

fn check_length(field: &'static str, value: &str) -> Result<(), AddressError> {
    if value.chars().count() > ShippingAddress::MAX_FIELD_LENGTH {
        return Err(AddressError::TooLong {
            field,
            max: ShippingAddress::MAX_FIELD_LENGTH,
        });
    }
    Ok(())
}
