//! Payment provider name type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ProviderName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The input string is empty.
    #[error("provider cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("provider must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[a-z0-9_-]`.
    #[error("provider contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// The name of a payment provider (e.g. `manual`, `midtrans`).
///
/// Provider names appear in webhook URLs and form half of the unique key of a
/// payment, so they are restricted to a small, unambiguous alphabet.
///
/// ## Constraints
///
/// - Length: 1-64 characters
/// - Characters: lowercase ASCII letters, digits, `_` and `-`
///
/// ## Examples
///
/// ```
/// use cartage_core::ProviderName;
///
/// assert!(ProviderName::parse("manual").is_ok());
/// assert!(ProviderName::parse("bank-transfer_2").is_ok());
///
/// assert!(ProviderName::parse("").is_err());
/// assert!(ProviderName::parse("Manual").is_err());
/// assert!(ProviderName::parse("a/b").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderName(String);

impl ProviderName {
    /// Maximum length of a provider name.
    pub const MAX_LENGTH: usize = 64;

    /// The provider used when a caller does not name one.
    pub const MANUAL: &'static str = "manual";

    /// Parse a `ProviderName` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 64 characters, or
    /// contains anything other than `[a-z0-9_-]`.
    pub fn parse(s: &str) -> Result<Self, ProviderError> {
        if s.is_empty() {
            return Err(ProviderError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(ProviderError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-'))
        {
            return Err(ProviderError::InvalidCharacter(c));
        }

        Ok(Self(s.to_owned()))
    }

    /// The baseline provider that needs no external integration.
    #[must_use]
    pub fn manual() -> Self {
        Self(Self::MANUAL.to_owned())
    }

    /// Returns the provider name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ProviderName {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProviderName {
    type Error = ProviderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProviderName> for String {
    fn from(name: ProviderName) -> Self {
        name.0
    }
}

impl AsRef<str> for ProviderName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
