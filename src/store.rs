//! A single mutable state record with synchronous change notification.
//!
//! Listeners run inside the call that changed the state, in the order the
//! changes were applied. A listener registered through [`Store::select`] is
//! called with the current value right away and afterwards only when the
//! selected value changes. Listeners must not call back into the same store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Listener<S> = Box<dyn FnMut(&S) + Send>;

struct Listeners<S> {
    next_id: u64,
    entries: Vec<(u64, Listener<S>)>,
}

struct StoreInner<S> {
    state: Mutex<Arc<S>>,
    // Held for the whole update so notifications cannot interleave.
    listeners: Mutex<Listeners<S>>,
}

pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: Send + Sync + 'static> Store<S> {
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(Arc::new(initial)),
                listeners: Mutex::new(Listeners {
                    next_id: 0,
                    entries: Vec::new(),
                }),
            }),
        }
    }

    pub fn snapshot(&self) -> Arc<S> {
        Arc::clone(&lock(&self.inner.state))
    }

    /// Replaces the state with the value returned by `f`. Returning `None`
    /// leaves the state untouched and notifies nobody.
    pub fn modify<F>(&self, f: F) -> bool
    where
        F: FnOnce(&S) -> Option<S>,
    {
        let mut listeners = lock(&self.inner.listeners);
        let next = {
            let mut state = lock(&self.inner.state);
            let Some(next) = f(&**state) else {
                return false;
            };
            let next = Arc::new(next);
            *state = Arc::clone(&next);
            next
        };

        for (_, listener) in listeners.entries.iter_mut() {
            listener(&*next);
        }
        true
    }

    /// Observes the whole state, starting with the current snapshot.
    pub fn subscribe<F>(&self, mut on_change: F) -> Subscription
    where
        F: FnMut(&S) + Send + 'static,
    {
        let mut listeners = lock(&self.inner.listeners);
        on_change(&*self.snapshot());
        self.register(&mut listeners, Box::new(on_change))
    }

    /// Observes one projection of the state, skipping updates that leave it
    /// unchanged.
    pub fn select<T, P, F>(&self, project: P, mut on_change: F) -> Subscription
    where
        T: PartialEq + Send + 'static,
        P: Fn(&S) -> T + Send + 'static,
        F: FnMut(&T) + Send + 'static,
    {
        let mut listeners = lock(&self.inner.listeners);
        let mut last = project(&*self.snapshot());
        on_change(&last);

        let listener = move |state: &S| {
            let value = project(state);
            if value != last {
                on_change(&value);
                last = value;
            }
        };
        self.register(&mut listeners, Box::new(listener))
    }

    fn register(&self, listeners: &mut Listeners<S>, listener: Listener<S>) -> Subscription {
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, listener));

        let inner = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || remove_listener(&inner, id))),
        }
    }
}

fn remove_listener<S>(inner: &Weak<StoreInner<S>>, id: u64) {
    if let Some(inner) = inner.upgrade() {
        lock(&inner.listeners)
            .entries
            .retain(|(entry, _)| *entry != id);
    }
}

/// Keeps a listener registered until dropped.
#[must_use = "dropping a subscription unregisters its listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
