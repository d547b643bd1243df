use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    Change, Disposer, Middleware, MiddlewareContext, MiddlewareId, Snapshot,
    dispatch::{DispatchLock, isolate, lock},
    subscription::Registry,
};

struct Inner<K, V> {
    state: Mutex<HashMap<K, Arc<V>>>,
    registry: Mutex<Registry<K, V>>,
    dispatch: DispatchLock,
}

/// Keyed observable state container.
///
/// `Store` is a cheap handle; clones share the same state and subscribers.
/// Updates from different threads are dispatched one at a time, while a
/// callback may itself update the store (the nested update is fully
/// dispatched before the outer one continues).
pub struct Store<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for Store<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("slots", &lock(&self.inner.state).len())
            .finish_non_exhaustive()
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn new<I>(initial: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let state = initial
            .into_iter()
            .map(|(key, value)| (key, Arc::new(value)))
            .collect();
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                registry: Mutex::new(Registry::new()),
                dispatch: DispatchLock::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, HashMap<K, Arc<V>>> {
        lock(&self.inner.state)
    }

    fn registry(&self) -> MutexGuard<'_, Registry<K, V>> {
        lock(&self.inner.registry)
    }

    /// Independent copy of the whole state.
    pub fn get_state(&self) -> Snapshot<K, V> {
        Snapshot::from_map(self.state().clone())
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.state().get(key).cloned()
    }

    /// Stores `value` under `key`, then notifies middleware, keyed
    /// subscribers of `key` and wildcard subscribers, in that order.
    ///
    /// Every update notifies, even when the value did not change. A panic in
    /// one callback is logged and the remaining callbacks still run.
    pub fn set_state(&self, key: K, value: V) {
        let _dispatch = self.inner.dispatch.enter();

        let new_value = Arc::new(value);
        let old_value = self.state().insert(key.clone(), Arc::clone(&new_value));

        let middleware = self.registry().middleware_chain();
        if !middleware.is_empty() {
            let state = self.get_state();
            let ctx = MiddlewareContext {
                key: &key,
                old_value: old_value.as_deref(),
                new_value: &new_value,
                state: &state,
            };
            for m in middleware {
                isolate("middleware", || m.on_set(&ctx));
            }
        }

        let keyed = self.registry().keyed_chain(&key);
        for callback in keyed {
            isolate("subscriber", || callback(&new_value, old_value.as_deref()));
        }

        let wildcard = self.registry().wildcard_chain();
        if !wildcard.is_empty() {
            let state = self.get_state();
            let change = Change::Key(key);
            for callback in wildcard {
                isolate("wildcard subscriber", || callback(&state, &change));
            }
        }
    }

    /// Applies every update, then notifies wildcard subscribers once.
    ///
    /// Middleware and keyed subscribers are not called. Wildcard
    /// subscribers are notified even for an empty batch.
    pub fn batch_update<I>(&self, updates: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let updates: Vec<(K, V)> = updates.into_iter().collect();
        let _dispatch = self.inner.dispatch.enter();

        let mut changed: Vec<K> = Vec::with_capacity(updates.len());
        {
            let mut state = self.state();
            for (key, value) in updates {
                state.insert(key.clone(), Arc::new(value));
                if !changed.contains(&key) {
                    changed.push(key);
                }
            }
        }
        tracing::debug!(keys = ?changed, "batch update applied");

        let wildcard = self.registry().wildcard_chain();
        let state = self.get_state();
        let change = Change::Batch(changed);
        for callback in wildcard {
            isolate("wildcard subscriber", || callback(&state, &change));
        }
    }

    /// Calls `callback(new, old)` after every `set_state` of `key`.
    pub fn subscribe<F>(&self, key: K, callback: F) -> Disposer
    where
        F: Fn(&V, Option<&V>) + Send + Sync + 'static,
    {
        let id = self.registry().add_keyed(key.clone(), Arc::new(callback));
        let store = Arc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = store.upgrade() {
                lock(&inner.registry).remove_keyed(&key, id);
            }
        })
    }

    /// Calls `callback(state, change)` after every update of any key.
    pub fn subscribe_all<F>(&self, callback: F) -> Disposer
    where
        F: Fn(&Snapshot<K, V>, &Change<K>) + Send + Sync + 'static,
    {
        let id = self.registry().add_wildcard(Arc::new(callback));
        let store = Arc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = store.upgrade() {
                lock(&inner.registry).remove_wildcard(id);
            }
        })
    }

    pub fn use_middleware<M>(&self, middleware: M) -> MiddlewareId
    where
        M: Middleware<K, V> + 'static,
    {
        self.registry().add_middleware(Arc::new(middleware))
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove_middleware(&self, id: MiddlewareId) -> bool {
        self.registry().remove_middleware(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().subscriber_count()
    }
}
