//! Application state shared across handlers.

use std::sync::Arc;

use crate::services::Helpdesk;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and gives handlers access to
/// the helpdesk services over the configured store.
pub struct AppState<S> {
    inner: Arc<Helpdesk<S>>,
}

impl<S> AppState<S> {
    /// Create a new application state around `helpdesk`.
    #[must_use]
    pub fn new(helpdesk: Helpdesk<S>) -> Self {
        Self {
            inner: Arc::new(helpdesk),
        }
    }

    /// Get a reference to the helpdesk services.
    #[must_use]
    pub fn helpdesk(&self) -> &Helpdesk<S> {
        &self.inner
    }
}

// Manual impl: the store itself need not be `Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
