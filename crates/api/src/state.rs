//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::CheckoutSettings;
use crate::db::Store;
use crate::services::ReferenceGenerator;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Generic over the store so route tests can
/// run against [`MemoryStore`](crate::db::MemoryStore).
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    store: S,
    settings: CheckoutSettings,
    references: Arc<dyn ReferenceGenerator>,
}

// Manual impl: `S: Clone` is not needed to clone the `Arc`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store> AppState<S> {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        store: S,
        settings: CheckoutSettings,
        references: Arc<dyn ReferenceGenerator>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                settings,
                references,
            }),
        }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get a reference to the checkout settings.
    #[must_use]
    pub fn settings(&self) -> &CheckoutSettings {
        &self.inner.settings
    }

    /// Get the reference generator.
    #[must_use]
    pub fn references(&self) -> &dyn ReferenceGenerator {
        self.inner.references.as_ref()
    }
}
