use std::{collections::HashMap, fmt, hash::Hash, sync::Arc};

use crate::{Middleware, MiddlewareId, Snapshot};

pub(crate) type KeyedCallback<V> = Arc<dyn Fn(&V, Option<&V>) + Send + Sync>;
pub(crate) type WildcardCallback<K, V> = Arc<dyn Fn(&Snapshot<K, V>, &Change<K>) + Send + Sync>;

/// What a wildcard subscriber is told about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change<K> {
    /// One `set_state`.
    Key(K),
    /// One `batch_update`, keys in first-seen order. May be empty.
    Batch(Vec<K>),
}

impl<K: PartialEq> Change<K> {
    pub fn keys(&self) -> &[K] {
        match self {
            Self::Key(key) => std::slice::from_ref(key),
            Self::Batch(keys) => keys,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys().contains(key)
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }
}

/// Removes one subscription when [`Disposer::dispose`] is called.
///
/// Dropping the disposer without calling `dispose` leaves the subscription
/// registered. Disposing after the store is gone does nothing.
pub struct Disposer(Box<dyn FnOnce() + Send>);

impl Disposer {
    pub(crate) fn new(dispose: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(dispose))
    }

    pub fn dispose(self) {
        (self.0)();
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer").finish_non_exhaustive()
    }
}

/// Registered callbacks, each tagged with a unique id so that registering
/// the same closure twice yields two independent entries.
pub(crate) struct Registry<K, V> {
    next_id: u64,
    keyed: HashMap<K, Vec<(u64, KeyedCallback<V>)>>,
    wildcard: Vec<(u64, WildcardCallback<K, V>)>,
    middleware: Vec<(u64, Arc<dyn Middleware<K, V>>)>,
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash,
{
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            keyed: HashMap::new(),
            wildcard: Vec::new(),
            middleware: Vec::new(),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn add_keyed(&mut self, key: K, callback: KeyedCallback<V>) -> u64 {
        let id = self.next_id();
        self.keyed.entry(key).or_default().push((id, callback));
        id
    }

    pub(crate) fn remove_keyed(&mut self, key: &K, id: u64) {
        if let Some(callbacks) = self.keyed.get_mut(key) {
            callbacks.retain(|(entry, _)| *entry != id);
            if callbacks.is_empty() {
                self.keyed.remove(key);
            }
        }
    }

    pub(crate) fn add_wildcard(&mut self, callback: WildcardCallback<K, V>) -> u64 {
        let id = self.next_id();
        self.wildcard.push((id, callback));
        id
    }

    pub(crate) fn remove_wildcard(&mut self, id: u64) {
        self.wildcard.retain(|(entry, _)| *entry != id);
    }

    pub(crate) fn add_middleware(&mut self, middleware: Arc<dyn Middleware<K, V>>) -> MiddlewareId {
        let id = self.next_id();
        self.middleware.push((id, middleware));
        MiddlewareId(id)
    }

    pub(crate) fn remove_middleware(&mut self, id: MiddlewareId) -> bool {
        let before = self.middleware.len();
        self.middleware.retain(|(entry, _)| *entry != id.0);
        self.middleware.len() != before
    }

    // The chains below are cloned out so callbacks run without the registry
    // lock and may subscribe or dispose freely.

    pub(crate) fn keyed_chain(&self, key: &K) -> Vec<KeyedCallback<V>> {
        self.keyed
            .get(key)
            .map(|callbacks| callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn wildcard_chain(&self) -> Vec<WildcardCallback<K, V>> {
        self.wildcard.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }

    pub(crate) fn middleware_chain(&self) -> Vec<Arc<dyn Middleware<K, V>>> {
        self.middleware.iter().map(|(_, m)| Arc::clone(m)).collect()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.keyed.values().map(Vec::len).sum::<usize>() + self.wildcard.len()
    }
}
