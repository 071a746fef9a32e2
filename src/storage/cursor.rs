//! Lazy Traversal Views
//!
//! [`keys`](ExpiringStore::keys), [`values`](ExpiringStore::values) and
//! [`entries`](ExpiringStore::entries) return a [`View`]: a cursor over the
//! store itself, not a copy of it.
//!
//! ## How a View Advances
//!
//! The cursor remembers the sequence number of the last pair it visited. On
//! every `next()` it:
//!
//! 1. Locks the store and samples the clock once
//! 2. Looks up the first pair with a greater sequence number
//! 3. Evicts and skips it if it has expired, repeating step 2
//! 4. Projects the first live pair (cloning what it yields) and unlocks
//!
//! Because the lock is released between steps, the view observes mutations
//! made while it is being drained, through this handle or any clone of it:
//!
//! - a key inserted before the cursor reaches its position is yielded
//! - a key deleted before the cursor reaches it is not
//! - an overwritten key keeps its position and yields its newest value
//!
//! A view is single-pass. Once exhausted, build a new one to traverse again.
//! It borrows the store, so it cannot outlive it.

use crate::storage::engine::ExpiringStore;
use crate::storage::entry::Entry;
use std::hash::Hash;

/// A lazy, live, single-pass view over the live entries of a store.
pub struct View<'a, K, V, T> {
    store: &'a ExpiringStore<K, V>,
    /// Sequence number of the last pair visited
    after: Option<u64>,
    project: fn(&K, &Entry<V>) -> T,
}

/// Live keys in insertion order.
pub type Keys<'a, K, V> = View<'a, K, V, K>;

/// Live values in insertion order.
pub type Values<'a, K, V> = View<'a, K, V, V>;

/// Live `(key, value)` pairs in insertion order.
pub type Entries<'a, K, V> = View<'a, K, V, (K, V)>;

impl<'a, K, V, T> View<'a, K, V, T> {
    pub(crate) fn new(store: &'a ExpiringStore<K, V>, project: fn(&K, &Entry<V>) -> T) -> Self {
        Self {
            store,
            after: None,
            project,
        }
    }
}

impl<'a, K, V, T> Iterator for View<'a, K, V, T>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let (seq, item) = self.store.shared.advance(self.after, true, self.project)?;
        self.after = Some(seq);
        Some(item)
    }
}

impl<'a, K, V, T> std::fmt::Debug for View<'a, K, V, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View").field("after", &self.after).finish()
    }
}

/// Every stored `(key, entry)` pair in insertion order, expired or not.
///
/// Walks like a [`View`] but neither filters nor evicts.
pub struct RawEntries<'a, K, V> {
    store: &'a ExpiringStore<K, V>,
    after: Option<u64>,
}

impl<'a, K, V> RawEntries<'a, K, V> {
    pub(crate) fn new(store: &'a ExpiringStore<K, V>) -> Self {
        Self { store, after: None }
    }
}

impl<'a, K, V> Iterator for RawEntries<'a, K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Item = (K, Entry<V>);

    fn next(&mut self) -> Option<Self::Item> {
        let (seq, item) = self
            .store
            .shared
            .advance(self.after, false, |key, entry| (key.clone(), entry.clone()))?;
        self.after = Some(seq);
        Some(item)
    }
}

impl<'a, K, V> std::fmt::Debug for RawEntries<'a, K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawEntries")
            .field("after", &self.after)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{ExpiringStore, ManualClock};
    use crate::StoreConfig;
    use std::time::Duration;

    const NOW: u64 = 1_700_000_000_000;

    fn store_at(now: u64) -> (ExpiringStore<String, u32>, ManualClock) {
        let clock = ManualClock::new(now);
        let config = StoreConfig::new(Duration::from_secs(10));
        (ExpiringStore::with_clock(config, clock.clone()).unwrap(), clock)
    }

    fn populate(store: &ExpiringStore<String, u32>) {
        store.set("a".to_string(), 1);
        store.set_raw("expire1".to_string(), 10, NOW - 1000);
        store.set("b".to_string(), 2);
        store.set_raw("expire2".to_string(), 20, NOW - 1);
        store.set("c".to_string(), 3);
    }

    #[test]
    fn test_entries_in_insertion_order() {
        let (store, _) = store_at(NOW);
        store.set("x".to_string(), 1);
        store.set("y".to_string(), 2);
        store.set("z".to_string(), 3);

        let entries: Vec<_> = store.entries().collect();
        assert_eq!(
            entries,
            vec![
                ("x".to_string(), 1),
                ("y".to_string(), 2),
                ("z".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_entries_skip_expired() {
        let (store, _) = store_at(NOW);
        store.set("a".to_string(), 1);
        store.set("b".to_string(), 2);
        store.set("c".to_string(), 3);
        store.set_raw("d".to_string(), 4, NOW - 1);
        store.set_raw("e".to_string(), 5, NOW - 1);

        let keys: Vec<_> = store.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert!(!store.has("d"));
        assert!(!store.has("e"));
    }

    #[test]
    fn test_keys_and_values_skip_expired() {
        let (store, _) = store_at(NOW);
        populate(&store);

        let keys: Vec<_> = store.keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);

        populate(&store);
        let values: Vec<_> = store.values().collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_traversal_evicts_expired() {
        let (store, _) = store_at(NOW);
        populate(&store);
        assert_eq!(store.len(), 5);

        assert_eq!(store.keys().count(), 3);
        assert_eq!(store.len(), 3);
        assert_eq!(store.stats().lazily_evicted, 2);
    }

    #[test]
    fn test_view_on_boundary() {
        let (store, clock) = store_at(NOW);
        store.set_raw("edge".to_string(), 1, NOW + 5);

        clock.set(NOW + 5);
        assert_eq!(store.keys().count(), 1);

        clock.set(NOW + 6);
        assert_eq!(store.keys().count(), 0);
    }

    #[test]
    fn test_view_is_lazy() {
        let (store, clock) = store_at(NOW);
        store.set_raw("a".to_string(), 1, NOW + 100);
        store.set_raw("b".to_string(), 2, NOW + 1);

        let mut keys = store.keys();
        assert_eq!(keys.next().as_deref(), Some("a"));

        // "b" expires after the view was created but before the cursor reached it
        clock.advance(Duration::from_millis(2));
        assert_eq!(keys.next(), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_view_sees_live_mutations() {
        let (store, _) = store_at(NOW);
        store.set("a".to_string(), 1);
        store.set("b".to_string(), 2);
        store.set("c".to_string(), 3);

        let mut entries = store.entries();
        assert_eq!(entries.next(), Some(("a".to_string(), 1)));

        store.delete("b");
        store.set("c".to_string(), 30);
        store.set("d".to_string(), 4);
        // Behind the cursor: not revisited
        store.set("a".to_string(), 10);

        let rest: Vec<_> = entries.collect();
        assert_eq!(rest, vec![("c".to_string(), 30), ("d".to_string(), 4)]);
    }

    #[test]
    fn test_view_tolerates_clear() {
        let (store, _) = store_at(NOW);
        store.set("a".to_string(), 1);
        store.set("b".to_string(), 2);

        let mut keys = store.keys();
        assert!(keys.next().is_some());

        store.clear();
        assert_eq!(keys.next(), None);
    }

    #[test]
    fn test_view_is_single_pass() {
        let (store, _) = store_at(NOW);
        store.set("a".to_string(), 1);

        let mut keys = store.keys();
        assert_eq!(keys.by_ref().count(), 1);
        assert_eq!(keys.next(), None);

        // A fresh view starts over
        assert_eq!(store.keys().count(), 1);
    }

    #[test]
    fn test_raw_entries_include_expired() {
        let (store, _) = store_at(NOW);
        populate(&store);

        let raw: Vec<_> = store.raw_entries().map(|(k, e)| (k, e.expire_at())).collect();
        assert_eq!(raw.len(), 5);
        assert_eq!(raw[1], ("expire1".to_string(), NOW - 1000));
        assert_eq!(raw[3], ("expire2".to_string(), NOW - 1));

        // Nothing was evicted along the way
        assert_eq!(store.len(), 5);
    }
}
