use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Handle returned by `Emitter::on`, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listeners<E> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener<E>)>,
}

/// Synchronous listener registry.
///
/// `emit` calls every listener in registration order on the caller's
/// thread, after releasing the registry lock, so a listener may subscribe,
/// unsubscribe or read the emitting store. Cloning shares the registry.
pub struct Emitter<E> {
    listeners: Arc<Mutex<Listeners<E>>>,
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Emitter {
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.len())
            .finish()
    }
}

impl<E> Emitter<E> {
    pub fn new() -> Self {
        Emitter {
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 1,
                entries: Vec::new(),
            })),
        }
    }

    pub fn on<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        let id = SubscriptionId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.entries.len();
        listeners.entries.retain(|(existing, _)| *existing != id);
        listeners.entries.len() != before
    }

    pub fn emit(&self, event: &E) {
        let current: Vec<Listener<E>> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in current {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
