//! Random external references: order numbers and provider references.
//!
//! Both are random and may collide. Callers insert with a uniqueness guard
//! and ask for another value when the insert reports a conflict.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;

use cartage_core::OrderNumber;

/// Source of fresh order numbers and provider references.
pub trait ReferenceGenerator: Send + Sync + 'static {
    /// A human-readable order number stamped with today's date.
    fn order_number(&self) -> OrderNumber;

    /// An opaque, high-entropy provider reference.
    fn provider_ref(&self) -> String;
}

/// Generator backed by the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomReferences;

impl ReferenceGenerator for RandomReferences {
    fn order_number(&self) -> OrderNumber {
        let suffix: [u8; 3] = rand::random();
        OrderNumber::compose(Utc::now().date_naive(), suffix)
    }

    fn provider_ref(&self) -> String {
        let bytes: [u8; 16] = rand::random();
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[cfg(test)]
pub(crate) use scripted::ScriptedReferences;


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_shape() {
        let number = RandomReferences.order_number();
        let parts: Vec<&str> = number.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_provider_ref_is_url_safe_128_bits() {
        let reference = RandomReferences.provider_ref();
        assert_eq!(reference.len(), 22);
        assert!(
            reference
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_eq!(URL_SAFE_NO_PAD.decode(&reference).unwrap().len(), 16);
        assert_ne!(reference, RandomReferences.provider_ref());
    }

    #[test]
    fn test_scripted_references_replay_then_fall_back() {
        let scripted = ScriptedReferences::with_order_numbers(&["ORD-1", "ORD-2"]);
        assert_eq!(scripted.order_number().as_str(), "ORD-1");
        assert_eq!(scripted.order_number().as_str(), "ORD-2");
        assert_eq!(
            scripted.order_number().as_str().len(),
            "ORD-20260101-ABCDEF".len()
        );
    }
}
