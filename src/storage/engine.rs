//! Expiring Key-Value Store
//!
//! This module implements [`ExpiringStore`], an insertion-ordered map where
//! every entry carries its own absolute expiry time.
//!
//! ## Design Decisions
//!
//! 1. **Two eviction paths**: expired entries are removed when a read touches
//!    them (lazy) and by a periodic background sweep (active). Nothing is
//!    evicted at the exact moment of expiry.
//! 2. **Ordered by sequence number**: each key gets a sequence number on first
//!    insertion. `HashMap<K, Slot>` answers lookups, `BTreeMap<seq, K>` fixes
//!    iteration order. Overwrites keep the sequence number, removals leave the
//!    rest untouched, so order survives both.
//! 3. **One lock**: the map, the order index and the sweep handle sit behind a
//!    single `parking_lot::Mutex`. Every operation runs to completion under it
//!    and no operation suspends.
//! 4. **Self-managing sweep**: the store starts its sweep task on insert and
//!    tears it down as soon as it becomes empty.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────── ExpiringStore (Arc) ────────────────────────┐
//! │  Mutex<State>                                                       │
//! │  ┌──────────────────────┐   ┌──────────────────┐   ┌─────────────┐  │
//! │  │ slots: HashMap       │   │ order: BTreeMap  │   │ sweep:      │  │
//! │  │   K -> (seq, Entry)  │◄──│   seq -> K       │   │ Option<...> │  │
//! │  └──────────────────────┘   └──────────────────┘   └─────────────┘  │
//! │  config, clock                                                      │
//! └─────────────────────────────────────────────────────────────────────┘
//!            ▲                                   ▲
//!            │ Weak                              │ &'a
//!    ┌───────┴────────┐                 ┌────────┴─────────┐
//!    │  sweep task    │                 │ keys/values/     │
//!    │  (tokio)       │                 │ entries views    │
//!    └────────────────┘                 └──────────────────┘
//! ```

use crate::config::StoreConfig;
use crate::error::ConfigError;
use crate::storage::clock::{Clock, SystemClock};
use crate::storage::cursor::{Entries, Keys, RawEntries, Values, View};
use crate::storage::entry::Entry;
use crate::storage::expiry::{self, SweepHandle};
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::ops::Bound;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// A stored entry together with its position in iteration order.
#[derive(Debug)]
struct Slot<V> {
    seq: u64,
    entry: Entry<V>,
}

/// Counters describing what the store has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Entries currently held, including expired ones not yet evicted
    pub stored: u64,
    /// `set`/`set_raw` calls
    pub sets: u64,
    /// `get` calls that returned a value
    pub hits: u64,
    /// `get` calls that returned nothing
    pub misses: u64,
    /// Entries evicted by reads and views
    pub lazily_evicted: u64,
    /// Entries evicted by sweeps
    pub swept: u64,
}

/// Everything guarded by the store lock.
#[derive(Debug)]
pub(crate) struct State<K, V> {
    slots: HashMap<K, Slot<V>>,
    order: BTreeMap<u64, K>,
    next_seq: u64,
    pub(crate) sweep: Option<SweepHandle>,
    next_sweep_id: u64,
    warned_no_runtime: bool,
    stats: StoreStats,
}

impl<K, V> State<K, V>
where
    K: Hash + Eq + Clone,
{
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            sweep: None,
            next_sweep_id: 0,
            warned_no_runtime: false,
            stats: StoreStats::default(),
        }
    }

    /// Stores `entry`, keeping the position of an existing key.
    fn insert(&mut self, key: K, entry: Entry<V>) {
        self.stats.sets += 1;

        if let Some(slot) = self.slots.get_mut(&key) {
            slot.entry = entry;
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.slots.insert(key, Slot { seq, entry });
    }

    fn remove<Q>(&mut self, key: &Q) -> Option<Entry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.slots.remove(key)?;
        self.order.remove(&slot.seq);
        Some(slot.entry)
    }

    /// Removes the entry at `seq`. Returns whether an entry was removed.
    fn remove_seq(&mut self, seq: u64) -> bool {
        match self.order.remove(&seq) {
            Some(key) => self.slots.remove(&key).is_some(),
            None => false,
        }
    }

    /// Checks liveness of `key` at `now_ms`, evicting it if expired.
    ///
    /// Returns `true` if the key is present and live.
    fn check_live<Q>(&mut self, key: &Q, now_ms: u64) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let live = match self.slots.get(key) {
            Some(slot) => slot.entry.is_live_at(now_ms),
            None => return false,
        };
        if live {
            return true;
        }

        self.remove(key);
        self.stats.lazily_evicted += 1;
        trace!(now_ms, "Lazily evicted expired entry");
        self.stop_sweep_if_empty();
        false
    }

    /// Evicts every entry expired at `now_ms`, returning how many went.
    fn evict_expired(&mut self, now_ms: u64) -> usize {
        let before = self.slots.len();
        let order = &mut self.order;

        self.slots.retain(|_, slot| {
            if slot.entry.is_expired_at(now_ms) {
                order.remove(&slot.seq);
                false
            } else {
                true
            }
        });

        let evicted = before - self.slots.len();
        self.stats.swept += evicted as u64;
        evicted
    }

    fn stop_sweep(&mut self) {
        // Dropping the handle signals the task
        self.sweep = None;
    }

    fn stop_sweep_if_empty(&mut self) {
        if self.slots.is_empty() {
            self.stop_sweep();
        }
    }
}

/// State shared between store handles, views and the sweep task.
pub(crate) struct Shared<K, V> {
    pub(crate) state: Mutex<State<K, V>>,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
}

impl<K, V> Shared<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Runs one tick of the sweep task identified by `id`.
    ///
    /// Returns `false` when the task should exit: it has been replaced, or
    /// the store is empty after the pass.
    pub(crate) fn sweep_tick(&self, id: u64) -> bool {
        let now_ms = self.clock.now_ms();
        let mut state = self.state.lock();

        if state.sweep.as_ref().map(SweepHandle::id) != Some(id) {
            return false;
        }

        let expired = state.evict_expired(now_ms);
        if expired > 0 {
            debug!(
                expired,
                remaining = state.slots.len(),
                "Expired entries swept"
            );
        }

        if state.slots.is_empty() {
            state.stop_sweep();
            return false;
        }

        true
    }

    /// Advances a view cursor past `after`.
    ///
    /// With `live_only`, expired pairs on the way are evicted and skipped.
    /// Returns the sequence number of the pair yielded and its projection.
    pub(crate) fn advance<T>(
        &self,
        after: Option<u64>,
        live_only: bool,
        project: fn(&K, &Entry<V>) -> T,
    ) -> Option<(u64, T)> {
        let now_ms = self.clock.now_ms();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut after = after;

        loop {
            let lower = match after {
                Some(seq) => Bound::Excluded(seq),
                None => Bound::Unbounded,
            };
            let seq = *state.order.range((lower, Bound::Unbounded)).next()?.0;

            if let Some(key) = state.order.get(&seq) {
                if let Some(slot) = state.slots.get(key) {
                    if !live_only || slot.entry.is_live_at(now_ms) {
                        return Some((seq, project(key, &slot.entry)));
                    }
                }
            }

            if state.remove_seq(seq) {
                state.stats.lazily_evicted += 1;
                trace!(now_ms, "Lazily evicted expired entry during traversal");
            }
            state.stop_sweep_if_empty();
            after = Some(seq);
        }
    }
}

/// An in-memory key-value store where every entry expires individually.
///
/// Cloning an `ExpiringStore` is cheap and yields another handle to the same
/// store. The background sweep stops when the last handle is dropped.
///
/// # Example
///
/// ```
/// use ttlkv::ExpiringStore;
/// use std::time::Duration;
///
/// let store = ExpiringStore::new(Duration::from_secs(60));
///
/// store.set("name", "Ariz");
/// assert_eq!(store.get("name"), Some("Ariz"));
///
/// // Already expired: invisible to every read
/// store.set_raw("stale", "gone", 0);
/// assert!(!store.has("stale"));
///
/// let keys: Vec<_> = store.keys().collect();
/// assert_eq!(keys, vec!["name"]);
/// ```
pub struct ExpiringStore<K, V> {
    pub(crate) shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for ExpiringStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V> std::fmt::Debug for ExpiringStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ExpiringStore")
            .field("stored", &state.slots.len())
            .field("sweeping", &state.sweep.is_some())
            .field("default_ttl", &self.shared.config.default_ttl)
            .field("clock", &self.shared.clock)
            .finish()
    }
}

impl<K, V> ExpiringStore<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a store whose `set` keeps entries for `default_ttl`, with the
    /// default sweep interval and the system clock.
    ///
    /// A TTL too large for a millisecond timestamp is clamped.
    ///
    /// The background sweep is spawned on the tokio runtime current at the
    /// time of an insert. Inserts made outside any runtime schedule no sweep:
    /// expired entries are then only evicted when a read or view touches
    /// them, or by [`sweep_now`](Self::sweep_now).
    pub fn new(default_ttl: Duration) -> Self {
        Self::from_parts(StoreConfig::new(default_ttl), Arc::new(SystemClock))
    }

    /// Creates a store from a validated configuration, using the system clock.
    ///
    /// Same runtime requirement for the background sweep as [`new`](Self::new).
    pub fn with_config(config: StoreConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }

    /// Creates a store that reads time from `clock`.
    pub fn with_clock(config: StoreConfig, clock: impl Clock) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(config, Arc::new(clock)))
    }

    fn from_parts(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::new()),
                config,
                clock,
            }),
        }
    }

    /// The TTL applied by [`set`](Self::set).
    pub fn default_ttl(&self) -> Duration {
        self.shared.config.default_ttl
    }

    fn now_ms(&self) -> u64 {
        self.shared.clock.now_ms()
    }

    /// Stores `value` under `key` for the default TTL.
    ///
    /// Overwriting an existing key keeps its position in iteration order.
    pub fn set(&self, key: K, value: V) {
        let entry = Entry::with_ttl(value, self.now_ms(), self.shared.config.default_ttl_ms());
        self.insert(key, entry);
    }

    /// Stores `value` under `key` until `expire_at` (ms since the Unix epoch).
    ///
    /// `expire_at` may already lie in the past, in which case the entry is
    /// invisible from the start and waits for eviction.
    pub fn set_raw(&self, key: K, value: V, expire_at: u64) {
        self.insert(key, Entry::new(value, expire_at));
    }

    fn insert(&self, key: K, entry: Entry<V>) {
        let mut state = self.shared.state.lock();
        state.insert(key, entry);
        self.ensure_sweep(&mut state);
    }

    /// Starts the sweep task unless a live one is already scheduled.
    ///
    /// A handle whose task died with its runtime is replaced.
    fn ensure_sweep(&self, state: &mut State<K, V>) {
        if state.sweep.as_ref().is_some_and(SweepHandle::is_alive) {
            return;
        }

        let id = state.next_sweep_id;
        state.next_sweep_id += 1;
        state.sweep = expiry::spawn(
            Arc::downgrade(&self.shared),
            self.shared.config.sweep_interval,
            id,
        );

        if state.sweep.is_none() && !state.warned_no_runtime {
            state.warned_no_runtime = true;
            warn!("No tokio runtime available, expired entries are only evicted on access");
        }
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. An expired
    /// entry is removed as a side effect.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now_ms = self.now_ms();
        let mut state = self.shared.state.lock();

        let value = if state.check_live(key, now_ms) {
            state.slots.get(key).map(|slot| slot.entry.value().clone())
        } else {
            None
        };

        match value {
            Some(_) => state.stats.hits += 1,
            None => state.stats.misses += 1,
        }
        value
    }

    /// Checks if a key exists and has not expired.
    ///
    /// Agrees with [`get`](Self::get) on liveness, including evicting an
    /// expired entry.
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now_ms = self.now_ms();
        self.shared.state.lock().check_live(key, now_ms)
    }

    /// Removes a key whether or not it has expired.
    ///
    /// # Returns
    ///
    /// Returns `true` if an entry was removed. The sweep stops if the store
    /// is left empty.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.shared.state.lock();
        let removed = state.remove(key).is_some();
        state.stop_sweep_if_empty();
        removed
    }

    /// Removes every entry and stops the sweep.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        state.slots.clear();
        state.order.clear();
        state.stop_sweep();
    }

    /// Stops the background sweep.
    ///
    /// Entries are kept, and the next insert starts a new sweep. Calling
    /// this when no sweep is running is a no-op.
    pub fn stop_sweep(&self) {
        self.shared.state.lock().stop_sweep();
    }

    /// Whether a sweep task is currently scheduled.
    pub fn is_sweeping(&self) -> bool {
        self.shared
            .state
            .lock()
            .sweep
            .as_ref()
            .is_some_and(SweepHandle::is_alive)
    }

    /// Runs one sweep pass now, returning the number of evicted entries.
    ///
    /// Stops the background sweep if the store is left empty.
    pub fn sweep_now(&self) -> usize {
        let now_ms = self.now_ms();
        let mut state = self.shared.state.lock();
        let evicted = state.evict_expired(now_ms);
        state.stop_sweep_if_empty();
        evicted
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.shared.state.lock().slots.len()
    }

    /// Returns true if nothing is stored, live or expired.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the store counters.
    pub fn stats(&self) -> StoreStats {
        let state = self.shared.state.lock();
        StoreStats {
            stored: state.slots.len() as u64,
            ..state.stats
        }
    }

    /// Live keys in insertion order. See [`View`] for traversal semantics.
    pub fn keys(&self) -> Keys<'_, K, V> {
        View::new(self, |key, _| key.clone())
    }

    /// Live values in insertion order. See [`View`] for traversal semantics.
    pub fn values(&self) -> Values<'_, K, V> {
        View::new(self, |_, entry| entry.value().clone())
    }

    /// Live `(key, value)` pairs in insertion order. See [`View`] for
    /// traversal semantics.
    pub fn entries(&self) -> Entries<'_, K, V> {
        View::new(self, |key, entry| (key.clone(), entry.value().clone()))
    }

    /// Every stored `(key, entry)` pair in insertion order, expired or not.
    ///
    /// Nothing is evicted.
    pub fn raw_entries(&self) -> RawEntries<'_, K, V> {
        RawEntries::new(self)
    }
}
