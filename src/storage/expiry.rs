//! Background Expiry Sweep
//!
//! Lazy expiry (checking on access) only reclaims keys that somebody reads
//! again. A key that expires and is never touched would otherwise stay in
//! memory for the life of the store, so each store owns a recurring sweep
//! task that evicts every expired entry.
//!
//! ## Lifecycle
//!
//! ```text
//!   set / set_raw on a store with no task ──> spawn task (SweepHandle stored)
//!                                                     │
//!              every `sweep_interval` ───────> evict expired entries
//!                                                     │
//!                      store left empty? ──yes──> task drops its own handle
//!
//!   delete / clear / lazy eviction leaving the store empty ──> handle dropped
//!   stop_sweep() ──> handle dropped (idempotent)
//!   last store handle dropped ──> handle dropped
//! ```
//!
//! The task only holds a [`Weak`] reference to the store, so it never keeps a
//! dropped store alive. Dropping a [`SweepHandle`] signals the task to exit.
//!
//! Every handle carries a generation id. A task that has been told to stop
//! but wakes once more compares its id with the store's current handle and
//! exits without touching a successor's handle.

use crate::storage::engine::Shared;
use std::hash::Hash;
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::debug;

/// A handle to a running sweep task.
///
/// When this handle is dropped, the task is stopped.
#[derive(Debug)]
pub(crate) struct SweepHandle {
    /// Generation id, unique per store
    id: u64,
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl SweepHandle {
    /// Generation id of the task behind this handle.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Whether the task behind this handle still exists.
    ///
    /// A task is gone once it returned or its runtime shut down, either of
    /// which drops its shutdown receiver.
    pub(crate) fn is_alive(&self) -> bool {
        !self.shutdown_tx.is_closed()
    }

    /// Signals the task to stop.
    ///
    /// This is called automatically when the handle is dropped. Calling it
    /// on a task that already exited is a no-op.
    pub(crate) fn stop(&self) {
        // Err only means the task is already gone
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.stop();
        debug!(id = self.id, "Sweep task stopped");
    }
}

/// Spawns a sweep task for `store` on the current tokio runtime.
///
/// Returns `None` when called outside a runtime; the store then relies on
/// lazy eviction until an insert happens inside one.
pub(crate) fn spawn<K, V>(
    store: Weak<Shared<K, V>>,
    interval: Duration,
    id: u64,
) -> Option<SweepHandle>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let runtime = Handle::try_current().ok()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    runtime.spawn(sweep_loop(store, interval, id, shutdown_rx));

    debug!(
        id,
        interval_ms = interval.as_millis() as u64,
        "Sweep task started"
    );

    Some(SweepHandle { id, shutdown_tx })
}

/// The main sweep loop.
async fn sweep_loop<K, V>(
    store: Weak<Shared<K, V>>,
    interval: Duration,
    id: u64,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; wait a full interval instead
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    return;
                }
            }
        }

        if *shutdown_rx.borrow() {
            return;
        }

        let Some(shared) = store.upgrade() else {
            return;
        };

        if !shared.sweep_tick(id) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{ExpiringStore, ManualClock};
    use crate::StoreConfig;
    use std::time::Duration;

    const NOW: u64 = 1_700_000_000_000;

    fn fast_store(clock: &ManualClock) -> ExpiringStore<String, u32> {
        let config = StoreConfig::new(Duration::from_secs(60))
            .with_sweep_interval(Duration::from_millis(10));
        ExpiringStore::with_clock(config, clock.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_sweep_cleans_expired_keys() {
        let clock = ManualClock::new(NOW);
        let store = fast_store(&clock);

        for i in 0..10 {
            store.set_raw(format!("key{}", i), i, NOW + 50);
        }
        store.set("persistent".to_string(), 99);
        assert_eq!(store.len(), 11);

        clock.advance(Duration::from_millis(51));
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Only the long-lived key survives, and nobody had to read the others
        assert_eq!(store.len(), 1);
        assert!(store.is_sweeping());
        assert_eq!(store.get("persistent"), Some(99));
        assert_eq!(store.stats().swept, 10);

        store.stop_sweep();
    }

    #[tokio::test]
    async fn test_sweep_stops_itself_when_store_empties() {
        let clock = ManualClock::new(NOW);
        let store = fast_store(&clock);

        store.set_raw("a".to_string(), 1, NOW);
        store.set_raw("b".to_string(), 2, NOW + 5);
        assert!(store.is_sweeping());

        clock.advance(Duration::from_millis(6));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store.is_empty());
        assert!(!store.is_sweeping());
    }

    #[tokio::test]
    async fn test_insert_after_self_stop_restarts_sweep() {
        let clock = ManualClock::new(NOW);
        let store = fast_store(&clock);

        store.set_raw("a".to_string(), 1, NOW);
        clock.advance(Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!store.is_sweeping());

        store.set_raw("b".to_string(), 2, NOW + 10);
        assert!(store.is_sweeping());

        clock.advance(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.is_empty());
        assert!(!store.is_sweeping());
    }

    #[tokio::test]
    async fn test_stopped_sweep_does_not_evict() {
        let clock = ManualClock::new(NOW);
        let store = fast_store(&clock);

        store.set_raw("key".to_string(), 1, NOW + 5);
        store.stop_sweep();
        assert!(!store.is_sweeping());

        clock.advance(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Still occupying memory, but invisible to reads
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("key"), None);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_sweep_task_ends_when_store_dropped() {
        let clock = ManualClock::new(NOW);
        let store = fast_store(&clock);
        store.set("key".to_string(), 1);

        let handle_rx = {
            let state = store.shared.state.lock();
            state.sweep.as_ref().map(|h| h.shutdown_tx.subscribe())
        };
        let mut rx = handle_rx.expect("sweep should be running");

        drop(store);

        // The sender is gone once the store (and its handle) is dropped
        assert!(rx.changed().await.is_err() || *rx.borrow());
    }

    #[test]
    fn test_insert_outside_runtime_falls_back_to_lazy_expiry() {
        let clock = ManualClock::new(NOW);
        let store = fast_store(&clock);

        store.set_raw("key".to_string(), 1, NOW);
        assert!(!store.is_sweeping());
        assert_eq!(store.get("key"), Some(1));

        clock.advance(Duration::from_millis(1));
        assert_eq!(store.get("key"), None);
        assert!(store.is_empty());
    }
}
