//! Keyed record storage.
//!
//! Every view in the engine reads through `read`, which hands back the type's
//! default for unknown keys instead of failing.

use std::borrow::Borrow;
use std::collections::BTreeMap;

/// Ordered map from identifier to record.
#[derive(Debug, Clone)]
pub struct KeyedStore<K, V> {
    entries: BTreeMap<K, V>,
}

impl<K: Ord, V> Default for KeyedStore<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> KeyedStore<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.get_mut(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Insert or replace, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Ord, V: Clone + Default> KeyedStore<K, V> {
    /// Value for `key`, or the default when absent.
    pub fn read<Q>(&self, key: &Q) -> V
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.get(key).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_defaults_for_unknown_keys() {
        let mut store: KeyedStore<String, u128> = KeyedStore::new();
        assert_eq!(store.read("missing"), 0);
        assert!(store.is_empty());

        store.insert("pool".to_string(), 40);
        assert_eq!(store.read("pool"), 40);
        assert!(store.contains("pool"));
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_insert_replaces() {
        let mut store: KeyedStore<String, String> = KeyedStore::new();
        assert!(store.insert("a".into(), "one".into()).is_none());
        assert_eq!(store.insert("a".into(), "two".into()).as_deref(), Some("one"));
        assert_eq!(store.read("a"), "two");
    }
}
