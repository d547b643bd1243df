use std::{collections::HashMap, fmt, hash::Hash, sync::Arc};

/// Point-in-time view of the whole store.
///
/// Values are shared with the store behind `Arc` and never mutated there, so
/// a snapshot is independent of later updates. Writing to a snapshot
/// (`insert`, `remove`, `get_mut`) only changes the snapshot: `get_mut`
/// clones the value first if the store still shares it.
pub struct Snapshot<K, V> {
    values: HashMap<K, Arc<V>>,
}

impl<K, V> Snapshot<K, V>
where
    K: Eq + Hash,
{
    pub(crate) fn from_map(values: HashMap<K, Arc<V>>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.values.get(key).map(Arc::as_ref)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.values.iter().map(|(key, value)| (key, value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.values.insert(key, Arc::new(value));
    }

    /// Returns `true` if the key was present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.values.remove(key).is_some()
    }
}

impl<K, V> Snapshot<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.values.get_mut(key).map(Arc::make_mut)
    }

    /// Fully owned copy of every slot.
    pub fn into_owned(self) -> HashMap<K, V> {
        self.values
            .into_iter()
            .map(|(key, value)| (key, Arc::unwrap_or_clone(value)))
            .collect()
    }
}

impl<K: Clone, V> Clone for Snapshot<K, V> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Snapshot<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}
