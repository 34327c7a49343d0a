//! Business logic services.
//!
//! Each service borrows a [`Store`](crate::db::Store) and runs one command
//! inside a single unit of work. Handlers construct them per request.

pub mod checkout;
pub mod payments;
pub mod references;
pub mod webhooks;

pub use checkout::{CheckoutError, CheckoutService};
pub use payments::{InitiatedPayment, PaymentError, PaymentService};
pub use references::{RandomReferences, ReferenceGenerator};
pub use webhooks::{WebhookError, WebhookOutcome, WebhookService};

#[cfg(test)]
pub(crate) use references::ScriptedReferences;
