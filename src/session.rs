//! AuthGate - escalation point for rejected credentials.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::emitter::{Emitter, SubscriptionId};

/// Shared "session rejected" latch.
///
/// The first `trip` runs every registered handler; further trips are no-ops
/// until `reset`. Clones share the latch and the handlers.
#[derive(Clone, Default, Debug)]
pub struct AuthGate {
    tripped: Arc<AtomicBool>,
    handlers: Emitter<()>,
}

impl AuthGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler run when the session is rejected, e.g. a redirect
    /// to sign-in.
    pub fn on_unauthorized<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.handlers.on(move |_| handler())
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.handlers.off(id)
    }

    /// Returns true if this call tripped the latch.
    pub fn trip(&self) -> bool {
        if self.tripped.swap(true, Ordering::SeqCst) {
            return false;
        }
        warn!(handlers = self.handlers.len(), "session rejected as unauthorized");
        self.handlers.emit(&());
        true
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.tripped.store(false, Ordering::SeqCst);
    }
}
