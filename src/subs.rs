//! Handler registry with RAII subscription guards.
//!
//! DESIGN
//! ======
//! Every `on_*` registration in this crate returns a [`Subscription`];
//! dropping the guard unregisters the handler. Leaked subscriptions are the
//! dominant resource-leak risk in an event-driven presence layer — a stale
//! handler keeps firing against torn-down state — so release is tied to
//! ownership instead of being a manual call sites can forget.
//!
//! Emission snapshots the handler list before invoking anything, so a
//! handler may re-enter the registry (subscribe, unsubscribe, publish)
//! without deadlocking.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

type Handler<E> = Box<dyn FnMut(&E) + Send>;

struct RegistryInner<E> {
    next_id: u64,
    handlers: BTreeMap<u64, Arc<Mutex<Handler<E>>>>,
}

/// A set of event handlers keyed by registration order.
pub struct HandlerRegistry<E> {
    inner: Arc<Mutex<RegistryInner<E>>>,
}

impl<E: 'static> Default for HandlerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for HandlerRegistry<E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<E: 'static> HandlerRegistry<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner { next_id: 0, handlers: BTreeMap::new() })),
        }
    }

    /// Register a handler. It fires for every event emitted while the
    /// returned guard is alive.
    pub fn subscribe(&self, handler: impl FnMut(&E) + Send + 'static) -> Subscription {
        let mut inner = self.inner.lock().expect("registry poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.handlers.insert(id, Arc::new(Mutex::new(Box::new(handler))));

        let weak = Arc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.lock().expect("registry poisoned").handlers.remove(&id);
                }
            })),
        }
    }

    /// Invoke every registered handler, in registration order.
    pub fn emit(&self, event: &E) {
        // Snapshot under the lock, dispatch outside it.
        let snapshot: Vec<Arc<Mutex<Handler<E>>>> = {
            let inner = self.inner.lock().expect("registry poisoned");
            inner.handlers.values().cloned().collect()
        };
        for handler in snapshot {
            (handler.lock().expect("handler poisoned"))(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry poisoned").handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Weak handle used by [`Subscription`] to detach without keeping the
/// registry alive.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Release the handler now instead of at drop.
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "subs_test.rs"]
mod tests;
